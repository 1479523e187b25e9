#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::net::{IpAddr, Ipv4Addr, SocketAddr};

use brewbot_core::app_state::SharedPanel;
use brewbot_core::server::PanelHandler;
use brewbot_core::telemetry::RetryPolicy;
use brewbot_core::workers;
use brewbot_firmware::hardware::{self, BoardPanel, PanelPeripherals};
use brewbot_firmware::network;
use brewbot_firmware::secrets::CONFIG;
use brewbot_firmware::telemetry::TcpTransport;
use edge_http::io::server::Server;
use edge_nal::TcpBind;
use edge_nal_embassy::{Tcp, TcpBuffers};
use embassy_executor::Spawner;
use embassy_net::Stack;
use embassy_time::{Delay, Duration, Timer};
use esp_hal::clock::CpuClock;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info};
use static_cell::StaticCell;

const HTTP_PORT: u16 = 80;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    let panel = hardware::init_panel(
        PanelPeripherals {
            ledc: peripherals.LEDC,
            led: peripherals.GPIO12,
            servo: peripherals.GPIO13,
            trigger: peripherals.GPIO5,
            echo: peripherals.GPIO18,
            relay: peripherals.GPIO4,
        },
        CONFIG.panel,
    )
    .expect("Failed to initialize control panel");

    static PANEL: StaticCell<SharedPanel<BoardPanel>> = StaticCell::new();
    let panel: &'static SharedPanel<BoardPanel> = PANEL.init(SharedPanel::new(panel));

    info!("Control panel ready");

    static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    let radio_init =
        RADIO.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));
    let (wifi_controller, interfaces) =
        esp_radio::wifi::new(radio_init, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi controller");

    let (stack, runner) = network::init_stack(interfaces.sta);

    spawner.spawn(
        network::connection(wifi_controller, CONFIG.internet).expect("Failed to spawn Wi-Fi task"),
    );
    spawner.spawn(network::net_task(runner).expect("Failed to spawn network task"));
    spawner.spawn(brew_worker(panel).expect("Failed to spawn brew worker"));
    spawner.spawn(
        telemetry_worker(
            TcpTransport::new(stack, CONFIG.telemetry),
            CONFIG.panel.retry_policy(),
        )
        .expect("Failed to spawn telemetry worker"),
    );

    network::wait_for_ip(stack).await;

    spawner.spawn(http_server(stack, panel).expect("Failed to spawn HTTP server"));

    loop {
        Timer::after(Duration::from_secs(60)).await;
    }
}

#[embassy_executor::task]
async fn brew_worker(panel: &'static SharedPanel<BoardPanel>) {
    workers::run_brew_worker(panel, Delay).await
}

#[embassy_executor::task]
async fn telemetry_worker(transport: Option<TcpTransport>, policy: RetryPolicy) {
    workers::run_telemetry_worker(transport, Delay, policy).await
}

#[embassy_executor::task]
async fn http_server(stack: Stack<'static>, panel: &'static SharedPanel<BoardPanel>) {
    info!("Starting HTTP server on port {}", HTTP_PORT);

    static TCP_BUFFERS: StaticCell<TcpBuffers<1, 2048, 2048>> = StaticCell::new();
    let buffers = TCP_BUFFERS.init(TcpBuffers::new());

    let tcp = Tcp::new(stack, buffers);
    let mut acceptor = tcp
        .bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), HTTP_PORT))
        .await
        .expect("Failed to bind HTTP port");

    let handler = PanelHandler::new(panel);
    let mut server = Server::<1, 2048, 32>::new();

    loop {
        if let Err(e) = server.run(Some(50_000), &mut acceptor, &handler).await {
            error!("HTTP server error: {:?}", e);
            Timer::after(Duration::from_millis(100)).await;
        }
    }
}
