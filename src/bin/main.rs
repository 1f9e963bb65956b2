//! MealTag Firmware - ESP32-S3 E-Paper Meal Schedule
//!
//! Environment variables required at build time:
//! - WIFI_SSID: WiFi network name
//! - WIFI_PASS: WiFi password (omit for open networks)
//! - MEAL_PLANNER_URL: Planner service URL (e.g., http://192.168.1.20:8000)
//!
//! Optional:
//! - REFRESH_MINUTES: sleep between refreshes (default 30)
//! - IDLE_TIMEOUT_SECONDS: interactive idle timeout (default 120)
//! - INTERACTION_MODE: `interactive` or `headless`
//! - PAGE_LAYOUT: `day` or `slots`

#![no_std]
#![no_main]

extern crate alloc;

use core::cell::RefCell;

use embassy_executor::Spawner;
use embassy_net::{Runner, StackResources};
use embassy_sync::mutex::Mutex;
use embassy_time::Delay;
use embedded_hal_bus::i2c::RefCellDevice;
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_alloc as _;
use esp_backtrace as _;
use esp_hal::{
    Blocking,
    clock::CpuClock,
    gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull},
    i2c::master::{Config as I2cConfig, I2c},
    rng::Rng,
    rtc_cntl::Rtc,
    spi::{
        Mode,
        master::{Config as SpiConfig, Spi},
    },
    time::Rate,
    timer::timg::TimerGroup,
};
use esp_println::println;
use esp_radio::{
    Controller,
    wifi::{Config as WifiConfig, WifiDevice},
};
use log::{info, warn};
use mealtag_firmware::config::{Config, RawConfig};
use mealtag_firmware::controller::{Devices, DutyCycleController};
use mealtag_firmware::epd::Ssd1680;
use mealtag_firmware::input::Button;
use mealtag_firmware::network::Credentials;
use mealtag_firmware::wake;

#[path = "main/board.rs"]
mod board;
#[path = "main/deep_sleep.rs"]
mod deep_sleep;
#[path = "main/pmic.rs"]
mod pmic;
#[path = "main/wifi.rs"]
mod wifi;

use board::{BoardRails, EmbassyClock, EpdPanel, FrontButtons, StatusLed};
use pmic::Axp2101;
use wifi::{SharedRadio, WifiTransport};

esp_bootloader_esp_idf::esp_app_desc!();

// When you are okay with using a nightly compiler it's better to use https://docs.rs/static_cell/2.1.0/static_cell/macro.make_static.html
macro_rules! mk_static {
    ($t:ty,$val:expr) => {{
        static STATIC_CELL: static_cell::StaticCell<$t> = static_cell::StaticCell::new();
        #[deny(unused_attributes)]
        let x = STATIC_CELL.uninit().write(($val));
        x
    }};
}

/// Front buttons and the RTC GPIO each one is wired to
pub const BUTTON_PINS: [(Button, u8); 4] = [
    (Button::A, 15),
    (Button::B, 14),
    (Button::C, 12),
    (Button::D, 11),
];

fn raw_config() -> RawConfig<'static> {
    RawConfig {
        wifi_ssid: Some(env!("WIFI_SSID")),
        wifi_pass: option_env!("WIFI_PASS"),
        base_url: Some(env!("MEAL_PLANNER_URL")),
        refresh_minutes: option_env!("REFRESH_MINUTES"),
        idle_timeout_seconds: option_env!("IDLE_TIMEOUT_SECONDS"),
        interaction_mode: option_env!("INTERACTION_MODE"),
        page_layout: option_env!("PAGE_LAYOUT"),
    }
}

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    // Init logger first so we can see any early crashes
    esp_println::logger::init_logger_from_env();

    let hal_config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(hal_config);

    // The wake cause is only valid until the next sleep; read it before anything else
    let wake_reason = wake::classify(deep_sleep::platform_wake(), &BUTTON_PINS);
    println!("MealTag boot! Wake reason: {:?}", wake_reason);

    let config = Config::from_raw(&raw_config()).expect("invalid build configuration");

    // esp-radio needs a heap
    esp_alloc::heap_allocator!(size: 72 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);
    info!("RTOS started");

    // ==================== Buttons and Status LED ====================
    // A=GPIO15, B=GPIO14, C=GPIO12, D=GPIO11, active low
    let pull_up = InputConfig::default().with_pull(Pull::Up);
    let buttons = FrontButtons::new([
        Input::new(peripherals.GPIO15, pull_up),
        Input::new(peripherals.GPIO14, pull_up),
        Input::new(peripherals.GPIO12, pull_up),
        Input::new(peripherals.GPIO11, pull_up),
    ]);

    // Red=GPIO45, Green=GPIO42, active low (off at boot)
    let indicator = StatusLed::new(
        Output::new(peripherals.GPIO45, Level::High, OutputConfig::default()),
        Output::new(peripherals.GPIO42, Level::High, OutputConfig::default()),
    );

    // ==================== Power Management (AXP2101) ====================
    // I2C: SDA=GPIO47, SCL=GPIO48, Address=0x34
    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(400)),
    )
    .expect("I2C init failed")
    .with_sda(peripherals.GPIO47)
    .with_scl(peripherals.GPIO48);
    let i2c = mk_static!(RefCell<I2c<'static, Blocking>>, RefCell::new(i2c));

    let mut pmic = Axp2101::new(RefCellDevice::new(i2c));
    if let Err(e) = pmic.init() {
        warn!("PMIC init failed: {:?}", e);
    }
    let battery = Axp2101::new(RefCellDevice::new(i2c));

    // ==================== E-Paper Display Setup ====================
    // SSD1680 2.9": SCK=GPIO36, MOSI=GPIO35, CS=GPIO8, DC=GPIO7, RST=GPIO6, BUSY=GPIO5
    let spi = Spi::new(
        peripherals.SPI2,
        SpiConfig::default()
            .with_frequency(Rate::from_mhz(4))
            .with_mode(Mode::_0),
    )
    .expect("SPI init failed")
    .with_sck(peripherals.GPIO36)
    .with_mosi(peripherals.GPIO35);

    let cs = Output::new(peripherals.GPIO8, Level::High, OutputConfig::default());
    let spi_device = ExclusiveDevice::new_no_delay(spi, cs).expect("SPI device init failed");
    let busy = Input::new(peripherals.GPIO5, InputConfig::default());
    let dc = Output::new(peripherals.GPIO7, Level::Low, OutputConfig::default());
    let rst = Output::new(peripherals.GPIO6, Level::High, OutputConfig::default());

    let mut delay = Delay;
    let epd = Ssd1680::new(spi_device, busy, dc, rst, &mut delay).expect("EPD init failed");
    info!("EPD initialized");

    // ==================== WiFi Setup ====================
    // Radio stays stopped until the controller powers the radio rail
    let radio = mk_static!(Controller<'static>, esp_radio::init().expect("radio init failed"));
    let (mut wifi_ctrl, interfaces) = esp_radio::wifi::new(radio, peripherals.WIFI, WifiConfig::default())
        .expect("WiFi init failed");
    wifi::configure(
        &mut wifi_ctrl,
        &Credentials {
            ssid: &config.wifi_ssid,
            password: &config.wifi_pass,
        },
    );

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        mk_static!(StackResources<3>, StackResources::<3>::new()),
        seed,
    );
    spawner.spawn(net_task(runner)).ok();
    let shared_radio = mk_static!(SharedRadio, Mutex::new(wifi_ctrl));

    // ==================== Wake Cycle ====================
    let devices = Devices {
        rails: BoardRails::new(pmic, shared_radio),
        indicator,
        transport: WifiTransport::new(shared_radio, stack),
        buttons,
        battery,
        panel: EpdPanel::new(epd),
    };
    let mut controller = DutyCycleController::new(config, wake_reason, devices, EmbassyClock);
    let plan = controller.run().await;

    let mut rtc = Rtc::new(peripherals.LPWR);
    deep_sleep::enter(&mut rtc, &plan, &mut delay)
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}
