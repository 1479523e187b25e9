//! Wi-Fi station and embassy-net stack

use brewbot_core::config::InternetConfig;
use embassy_net::{Runner, Stack, StackResources};
use embassy_time::{Duration, Timer};
use esp_hal::rng::Rng;
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent};
use log::{error, info, warn};
use static_cell::StaticCell;

/// Sockets: HTTP server, telemetry client, DHCP and DNS
const SOCKET_COUNT: usize = 5;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Create the DHCP-configured network stack on the station interface.
pub fn init_stack(
    device: WifiDevice<'static>,
) -> (Stack<'static>, Runner<'static, WifiDevice<'static>>) {
    static RESOURCES: StaticCell<StackResources<SOCKET_COUNT>> = StaticCell::new();

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    embassy_net::new(
        device,
        embassy_net::Config::dhcpv4(Default::default()),
        RESOURCES.init(StackResources::new()),
        seed,
    )
}

/// Wait until DHCP has handed out an address.
pub async fn wait_for_ip(stack: Stack<'static>) {
    stack.wait_link_up().await;
    info!("Link up, waiting for an address");
    stack.wait_config_up().await;
    if let Some(config) = stack.config_v4() {
        info!("Got IP: {}", config.address);
    }
}

/// Keep the station associated, retrying every few seconds.
#[embassy_executor::task]
pub async fn connection(mut controller: WifiController<'static>, internet: InternetConfig<'static>) {
    info!("Wi-Fi connection task started");

    loop {
        if controller.is_connected().unwrap_or(false) {
            controller.wait_for_event(WifiEvent::StaDisconnected).await;
            warn!("Wi-Fi disconnected");
            Timer::after(RECONNECT_DELAY).await;
        }

        if !matches!(controller.is_started(), Ok(true)) {
            let client = ClientConfig::default()
                .with_ssid(internet.ssid.into())
                .with_password(internet.password.into());
            if let Err(e) = controller.set_config(&ModeConfig::Client(client)) {
                error!("Invalid Wi-Fi configuration: {:?}", e);
                Timer::after(RECONNECT_DELAY).await;
                continue;
            }
            if let Err(e) = controller.start_async().await {
                error!("Failed to start Wi-Fi: {:?}", e);
                Timer::after(RECONNECT_DELAY).await;
                continue;
            }
            info!("Wi-Fi started");
        }

        info!("Connecting to {}", internet.ssid);
        match controller.connect_async().await {
            Ok(()) => info!("Wi-Fi connected"),
            Err(e) => {
                warn!("Failed to connect to Wi-Fi: {:?}", e);
                Timer::after(RECONNECT_DELAY).await;
            }
        }
    }
}

#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}
