//! Telemetry transport over an embassy-net TCP socket

use brewbot_core::config::TelemetryConfig;
use brewbot_core::telemetry::{
    TelemetryError, TelemetryTransport, format_post, parse_status_code,
};
use core::net::Ipv4Addr;
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpAddress, Stack};
use embassy_time::Duration;
use embedded_io_async::Write;
use log::{debug, warn};

const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TcpTransport {
    stack: Stack<'static>,
    host: &'static str,
    port: u16,
    rx_buffer: [u8; 1024],
    tx_buffer: [u8; 1024],
}

impl TcpTransport {
    /// `None` when telemetry is not configured
    pub fn new(stack: Stack<'static>, config: TelemetryConfig<'static>) -> Option<Self> {
        config.is_enabled().then_some(Self {
            stack,
            host: config.host,
            port: config.port,
            rx_buffer: [0; 1024],
            tx_buffer: [0; 1024],
        })
    }

    async fn resolve(&self) -> Result<IpAddress, TelemetryError> {
        if let Ok(address) = self.host.parse::<Ipv4Addr>() {
            return Ok(IpAddress::Ipv4(address));
        }

        let addresses = self
            .stack
            .dns_query(self.host, DnsQueryType::A)
            .await
            .map_err(|e| {
                warn!("DNS lookup of {} failed: {:?}", self.host, e);
                TelemetryError::Dns
            })?;
        addresses.first().copied().ok_or(TelemetryError::Dns)
    }
}

impl TelemetryTransport for TcpTransport {
    async fn post(&mut self, path: &str, body: &str) -> Result<u16, TelemetryError> {
        let address = self.resolve().await?;
        let request = format_post(self.host, path, body)?;

        let mut socket = TcpSocket::new(self.stack, &mut self.rx_buffer, &mut self.tx_buffer);
        socket.set_timeout(Some(SOCKET_TIMEOUT));

        socket.connect((address, self.port)).await.map_err(|e| {
            warn!("Connect to {}:{} failed: {:?}", self.host, self.port, e);
            TelemetryError::Connect
        })?;
        debug!("Connected to {}:{}", self.host, self.port);

        socket
            .write_all(request.as_bytes())
            .await
            .map_err(|_| TelemetryError::Io { operation: "write" })?;
        socket
            .flush()
            .await
            .map_err(|_| TelemetryError::Io { operation: "flush" })?;

        // Only the status line matters
        let mut response = [0u8; 64];
        let mut received = 0;
        while received < response.len() {
            let n = socket
                .read(&mut response[received..])
                .await
                .map_err(|_| TelemetryError::Io { operation: "read" })?;
            if n == 0 {
                break;
            }
            received += n;
            if response[..received].contains(&b'\n') {
                break;
            }
        }
        socket.close();
        // push the FIN out before the socket is dropped
        let _ = socket.flush().await;

        parse_status_code(&response[..received])
    }
}
