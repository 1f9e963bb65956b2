//! WiFi transport over esp-radio and embassy-net
//!
//! The `WifiController` is shared with the board rails: powering the radio
//! rail starts the controller, joining associates and waits for DHCP.

use embassy_net::Stack;
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Timer, with_timeout};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController};
use log::{debug, info, warn};
use mealtag_firmware::http::{self, HttpError, Url};
use mealtag_firmware::network::{ConnectError, Credentials, Transport};

pub type SharedRadio = Mutex<CriticalSectionRawMutex, WifiController<'static>>;

const DHCP_TIMEOUT: Duration = Duration::from_secs(20);
const SOCKET_TIMEOUT: Duration = Duration::from_secs(30);

/// Load station credentials; the controller is started later by the radio rail
pub fn configure(controller: &mut WifiController<'static>, credentials: &Credentials<'_>) {
    let client_config = ModeConfig::Client(
        ClientConfig::default()
            .with_ssid(credentials.ssid.into())
            .with_password(credentials.password.into()),
    );
    if let Err(e) = controller.set_config(&client_config) {
        warn!("WiFi config rejected: {:?}", e);
    }
}

/// Start or stop the radio
pub async fn set_radio_power(radio: &SharedRadio, enabled: bool) {
    let mut controller = radio.lock().await;
    let started = matches!(controller.is_started(), Ok(true));

    let result = match (enabled, started) {
        (true, false) => controller.start_async().await,
        (false, true) => controller.stop_async().await,
        _ => Ok(()),
    };
    match result {
        Ok(()) => debug!("WiFi {}", if enabled { "started" } else { "stopped" }),
        Err(e) => warn!("WiFi {} failed: {:?}", if enabled { "start" } else { "stop" }, e),
    }
}

pub struct WifiTransport {
    radio: &'static SharedRadio,
    stack: Stack<'static>,
    connected: bool,
}

impl WifiTransport {
    pub fn new(radio: &'static SharedRadio, stack: Stack<'static>) -> Self {
        Self {
            radio,
            stack,
            connected: false,
        }
    }
}

impl Transport for WifiTransport {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn join(&mut self, credentials: &Credentials<'_>) -> Result<(), ConnectError> {
        {
            let mut controller = self.radio.lock().await;
            if !matches!(controller.is_started(), Ok(true)) {
                return Err(ConnectError::Radio);
            }

            info!("Associating with {}...", credentials.ssid);
            if let Err(e) = controller.connect_async().await {
                // The driver reports no reason code here
                warn!("Association failed: {:?}", e);
                return Err(ConnectError::Auth);
            }
        }

        with_timeout(DHCP_TIMEOUT, wait_for_ip(self.stack))
            .await
            .map_err(|_| ConnectError::NoAddress)?;
        self.connected = true;
        Ok(())
    }

    async fn get(&mut self, url: &Url<'_>, buf: &mut [u8]) -> Result<usize, HttpError> {
        let ip = resolve_host(self.stack, url.host).await?;

        let mut rx_buf = [0u8; 2048];
        let mut tx_buf = [0u8; 512];
        let mut socket = TcpSocket::new(self.stack, &mut rx_buf, &mut tx_buf);
        socket.set_timeout(Some(SOCKET_TIMEOUT));
        socket.connect((ip, url.port)).await.map_err(|_| HttpError::Connect)?;

        let result = http::get(&mut socket, url, buf).await;
        socket.close();
        result
    }

    async fn leave(&mut self) {
        let mut controller = self.radio.lock().await;
        if let Err(e) = controller.disconnect_async().await {
            debug!("Disconnect error (may already be disconnected): {:?}", e);
        }
        self.connected = false;
    }
}

/// Wait for the link and a DHCP lease
async fn wait_for_ip(stack: Stack<'static>) {
    while !stack.is_link_up() {
        Timer::after(Duration::from_millis(200)).await;
    }
    loop {
        if let Some(config) = stack.config_v4() {
            info!("Got IP: {}", config.address);
            return;
        }
        Timer::after(Duration::from_millis(200)).await;
    }
}

/// Numeric hosts are used as-is, anything else goes through DNS
async fn resolve_host(stack: Stack<'static>, host: &str) -> Result<core::net::Ipv4Addr, HttpError> {
    if let Ok(ip) = http::parse_ipv4(host) {
        return Ok(ip);
    }

    debug!("Resolving {}", host);
    let addrs = stack
        .dns_query(host, DnsQueryType::A)
        .await
        .map_err(|_| HttpError::Connect)?;

    match addrs.first() {
        Some(embassy_net::IpAddress::Ipv4(v4)) => {
            let [a, b, c, d] = v4.octets();
            Ok(core::net::Ipv4Addr::new(a, b, c, d))
        }
        _ => Err(HttpError::Connect),
    }
}
