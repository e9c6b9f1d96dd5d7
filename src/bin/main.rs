#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::net::Ipv4Addr;

use embassy_executor::Spawner;
use embassy_net::{Ipv4Cidr, StaticConfigV4, tcp::TcpSocket};
use embassy_time::{Duration, Timer, WithTimeout};
use esp_hal::{
    clock::CpuClock,
    gpio::{Level, Output, OutputConfig},
    timer::timg::TimerGroup,
};
use log::{LevelFilter, info, warn};
use static_cell::StaticCell;

use eggtimer_core::app::TimerApp;
use eggtimer_hal_esp32s3::{clock::BoardClock, outputs::BoardOutputs};

#[path = "main/ap.rs"]
mod ap;
#[path = "main/dhcp.rs"]
mod dhcp;
#[path = "main/server.rs"]
mod server;

const AP_SSID: &str = "EGGTIMER";
const AP_PASSPHRASE: &str = "12345678";
const AP_ADDR: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 1);
const AP_PREFIX_LEN: u8 = 24;
// Radio country plan rides the esp-radio build config; logged for the record.
const REGULATORY_DOMAIN: &str = "JP";

const HTTP_PORT: u16 = 80;
const ACCEPT_POLL_MS: u64 = 200;
const CLIENT_READ_TIMEOUT_MS: u64 = 2_000;
const REQUEST_BUF_BYTES: usize = 2048;
const SOCKET_RX_BYTES: usize = 2048;
const SOCKET_TX_BYTES: usize = 4096;

const AP_ENSURE_EVERY_MS: u32 = 5_000;
const AP_LOG_EVERY_MS: u32 = 5_000;
const AP_SETTLE_MS: u64 = 200;
const AP_START_POLLS: u32 = 50;
const AP_START_POLL_MS: u64 = 100;

const INDEX_PAGE: &str = include_str!("../../assets/index.html");

static NET_RESOURCES: StaticCell<embassy_net::StackResources<4>> = StaticCell::new();

#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    loop {}
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    esp_println::logger::init_logger(LevelFilter::Info);
    esp_println::println!("boot: eggtimer starting");

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // esp-radio requires an allocator.
    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 65536);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Wiring: heartbeat LED on GPIO2, timer indicator on GPIO15.
    let liveness = Output::new(peripherals.GPIO2, Level::Low, OutputConfig::default());
    let indicator = Output::new(peripherals.GPIO15, Level::Low, OutputConfig::default());
    let outputs = BoardOutputs::new(liveness, indicator);

    let mut app = TimerApp::new(BoardClock::new(), outputs, INDEX_PAGE);

    info!("regulatory domain: {}", REGULATORY_DOMAIN);

    let radio = match esp_radio::init() {
        Ok(radio) => radio,
        Err(err) => {
            info!("esp-radio init failed: {:?}", err);
            loop {
                Timer::after_secs(1).await;
            }
        }
    };

    let (wifi_controller, interfaces) =
        match esp_radio::wifi::new(&radio, peripherals.WIFI, esp_radio::wifi::Config::default()) {
            Ok(parts) => parts,
            Err(err) => {
                info!("wifi peripheral init failed: {:?}", err);
                loop {
                    Timer::after_secs(1).await;
                }
            }
        };

    let stack_config = embassy_net::Config::ipv4_static(StaticConfigV4 {
        address: Ipv4Cidr::new(AP_ADDR, AP_PREFIX_LEN),
        gateway: None,
        dns_servers: heapless::Vec::new(),
    });
    let (stack, mut net_runner) = embassy_net::new(
        interfaces.ap,
        stack_config,
        NET_RESOURCES.init(embassy_net::StackResources::<4>::new()),
        0x00E6_6171_3E44_C0DE,
    );

    let mut access_point = ap::AccessPoint::new(wifi_controller, stack);
    access_point.start().await;

    info!("join \"{}\" (wpa2 pass \"{}\")", AP_SSID, AP_PASSPHRASE);
    info!("open http://{}/", AP_ADDR);

    let net_future = net_runner.run();
    let dhcp_future = dhcp::serve(stack);
    let control_future = async {
        let mut rx_buffer = [0u8; SOCKET_RX_BYTES];
        let mut tx_buffer = [0u8; SOCKET_TX_BYTES];

        // One sequential loop: own duties first, then at most one bounded
        // accept. A waiting client is never serviced concurrently with a
        // second one, and no duty can be starved for longer than one
        // connection plus its timeouts.
        loop {
            app.service();
            access_point.supervise().await;

            let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
            socket.set_timeout(Some(Duration::from_millis(CLIENT_READ_TIMEOUT_MS)));
            match socket
                .accept(HTTP_PORT)
                .with_timeout(Duration::from_millis(ACCEPT_POLL_MS))
                .await
            {
                Ok(Ok(())) => server::serve(&mut socket, &mut app).await,
                Ok(Err(err)) => {
                    warn!("accept failed: {:?}", err);
                    Timer::after_millis(ACCEPT_POLL_MS).await;
                }
                // Timeout is the idle tick that keeps the duties breathing.
                Err(_) => {}
            }
            socket.abort();
        }
    };

    let _ = embassy_futures::join::join3(net_future, dhcp_future, control_future).await;
    unreachable!()
}
