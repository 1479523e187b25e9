//! Async plumbing for the workers on the host

use std::time::Duration;

use brewbot_core::config::TelemetryConfig;
use brewbot_core::telemetry::{TelemetryError, TelemetryTransport, format_post, parse_status_code};
use embedded_hal_async::delay::DelayNs;
use log::{debug, warn};
use smol::Timer;
use smol::future;
use smol::io::{AsyncReadExt, AsyncWriteExt};
use smol::net::TcpStream;

/// Same limit the firmware puts on its telemetry socket
const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

/// Async delay on smol's timer
pub struct SmolDelay;

impl DelayNs for SmolDelay {
    async fn delay_ns(&mut self, ns: u32) {
        Timer::after(Duration::from_nanos(u64::from(ns))).await;
    }

    async fn delay_us(&mut self, us: u32) {
        Timer::after(Duration::from_micros(u64::from(us))).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        Timer::after(Duration::from_millis(u64::from(ms))).await;
    }
}

/// Posts telemetry to a real server over a host TCP socket
pub struct SmolTransport {
    host: String,
    port: u16,
    timeout: Duration,
}

impl SmolTransport {
    /// `None` when telemetry is not configured
    pub fn new(config: &TelemetryConfig<'_>) -> Option<Self> {
        config.is_enabled().then(|| Self {
            host: config.host.to_owned(),
            port: config.port,
            timeout: SOCKET_TIMEOUT,
        })
    }

    /// Connect, send the request and read back the status line.
    async fn exchange(&self, request: &[u8]) -> Result<u16, TelemetryError> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|e| {
                warn!("Connect to {}:{} failed: {}", self.host, self.port, e);
                TelemetryError::Connect
            })?;
        debug!("Connected to {}:{}", self.host, self.port);

        stream
            .write_all(request)
            .await
            .map_err(|_| TelemetryError::Io { operation: "write" })?;

        // Only the status line matters
        let mut response = [0u8; 64];
        let mut received = 0;
        while received < response.len() {
            let n = stream
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

        parse_status_code(&response[..received])
    }
}

impl TelemetryTransport for SmolTransport {
    async fn post(&mut self, path: &str, body: &str) -> Result<u16, TelemetryError> {
        let request = format_post(&self.host, path, body)?;

        let deadline = async {
            Timer::after(self.timeout).await;
            warn!("No answer from {}:{} within {:?}", self.host, self.port, self.timeout);
            Err(TelemetryError::Io {
                operation: "timeout",
            })
        };
        future::or(self.exchange(request.as_bytes()), deadline).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn transport(port: u16, timeout: Duration) -> SmolTransport {
        SmolTransport {
            host: "127.0.0.1".to_owned(),
            port,
            timeout,
        }
    }

    #[test]
    fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_secs(1));
            drop(stream);
        });

        let mut transport = transport(port, Duration::from_millis(100));
        let result = smol::block_on(transport.post("/water_alert", "{}"));

        assert_eq!(
            result,
            Err(TelemetryError::Io {
                operation: "timeout"
            })
        );
        server.join().unwrap();
    }

    #[test]
    fn test_status_line_is_enough() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 512];
            let _ = stream.read(&mut request).unwrap();
            stream.write_all(b"HTTP/1.0 204 No Content\r\n").unwrap();
            // keep the connection open past the reply
            thread::sleep(Duration::from_secs(1));
        });

        let mut transport = transport(port, Duration::from_secs(5));
        let result = smol::block_on(transport.post("/update_stats", r#"{"cups":2}"#));

        assert_eq!(result, Ok(204));
        server.join().unwrap();
    }

    #[test]
    fn test_refused_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut transport = transport(port, Duration::from_secs(5));
        let result = smol::block_on(transport.post("/update_stats", "{}"));

        assert_eq!(result, Err(TelemetryError::Connect));
    }
}
