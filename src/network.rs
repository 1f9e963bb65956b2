//! Network session: radio association plus one schedule request
//!
//! The session owns the response buffer. A fetch either yields a fully
//! decoded schedule or an error; the buffer is reused on the next fetch and
//! never exposed.

use core::str;

use log::{debug, info, warn};

use crate::http::{HttpError, Url};
use crate::schedule::{parse_schedule, schedule_url, Schedule, ScheduleError};

/// Size of the response buffer (headers + body)
pub const RESPONSE_BUFFER_SIZE: usize = 8192;

/// Network credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

/// Connection failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
    #[error("radio unavailable")]
    Radio,
    #[error("network rejected credentials")]
    Auth,
    #[error("network not found")]
    NotFound,
    #[error("no IP address")]
    NoAddress,
}

/// Every way a fetch can fail, from the radio up to the JSON shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("not connected")]
    NotConnected,
    #[error("wifi: {0}")]
    Connect(#[from] ConnectError),
    #[error("bad server URL")]
    InvalidUrl,
    #[error("{0}")]
    Http(#[from] HttpError),
    #[error("bad data: {0}")]
    Decode(#[from] ScheduleError),
}

/// Link layer plus a single HTTP exchange
pub trait Transport {
    fn is_connected(&self) -> bool;

    /// Associate and obtain an address
    async fn join(&mut self, credentials: &Credentials<'_>) -> Result<(), ConnectError>;

    /// Perform a GET; the body is left in `buf[..n]`
    async fn get(&mut self, url: &Url<'_>, buf: &mut [u8]) -> Result<usize, HttpError>;

    /// Drop the association
    async fn leave(&mut self);
}

/// Proof of an established connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connected {
    /// The link was already up and nothing was done
    pub reused: bool,
}

pub struct NetworkSession<T> {
    transport: T,
    buf: [u8; RESPONSE_BUFFER_SIZE],
}

impl<T: Transport> NetworkSession<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            buf: [0; RESPONSE_BUFFER_SIZE],
        }
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Join the network. A no-op when already connected.
    pub async fn connect(&mut self, credentials: &Credentials<'_>) -> Result<Connected, ConnectError> {
        if self.transport.is_connected() {
            debug!("Already connected to {}", credentials.ssid);
            return Ok(Connected { reused: true });
        }

        info!("Connecting to {}...", credentials.ssid);
        match self.transport.join(credentials).await {
            Ok(()) => {
                info!("Connected to {}", credentials.ssid);
                Ok(Connected { reused: false })
            }
            Err(e) => {
                warn!("Connect to {} failed: {}", credentials.ssid, e);
                Err(e)
            }
        }
    }

    /// Request and decode the upcoming schedule.
    ///
    /// The body is decoded before returning; any failure discards it.
    pub async fn fetch_schedule(&mut self, base_url: &str) -> Result<Schedule, FetchError> {
        if !self.transport.is_connected() {
            return Err(FetchError::NotConnected);
        }

        let full_url = schedule_url(base_url).ok_or(FetchError::InvalidUrl)?;
        let url = Url::parse(&full_url).map_err(|_| FetchError::InvalidUrl)?;
        info!("GET {}", full_url);

        let result = self.transport.get(&url, &mut self.buf).await;
        let len = match result {
            Ok(len) => len,
            Err(e) => {
                warn!("Request failed: {}", e);
                return Err(e.into());
            }
        };

        let body = str::from_utf8(&self.buf[..len]).map_err(|_| ScheduleError::Json)?;
        let schedule = parse_schedule(body).inspect_err(|e| warn!("Decode failed: {}", e))?;

        info!(
            "Fetched {} days (updated {})",
            schedule.len(),
            schedule.updated_at.as_deref().unwrap_or("?")
        );
        Ok(schedule)
    }

    pub async fn disconnect(&mut self) {
        if self.transport.is_connected() {
            debug!("Leaving network");
            self.transport.leave().await;
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FakeTransport, Recorder};
    use embassy_futures::block_on;

    const CREDS: Credentials<'static> = Credentials {
        ssid: "kitchen",
        password: "hunter22",
    };
    const BASE: &str = "http://10.0.0.2:8000";

    const ONE_DAY: &str = r#"{"days":[{"date":"Mar 3","day":"Monday","adult":{"dinner":"Soup"}}],"updated_at":"07:30"}"#;

    #[test]
    fn test_connect_is_idempotent() {
        let rec = Recorder::default();
        let mut session = NetworkSession::new(FakeTransport::new(&rec));

        let first = block_on(session.connect(&CREDS)).unwrap();
        let second = block_on(session.connect(&CREDS)).unwrap();

        assert!(!first.reused);
        assert!(second.reused);
        assert_eq!(rec.joins(), 1);
    }

    #[test]
    fn test_connect_failure() {
        let rec = Recorder::default();
        rec.fail_join(ConnectError::Auth);
        let mut session = NetworkSession::new(FakeTransport::new(&rec));

        assert_eq!(block_on(session.connect(&CREDS)), Err(ConnectError::Auth));
        assert!(!session.is_connected());
    }

    #[test]
    fn test_fetch_requires_connection() {
        let rec = Recorder::default();
        let mut session = NetworkSession::new(FakeTransport::new(&rec));
        assert_eq!(block_on(session.fetch_schedule(BASE)), Err(FetchError::NotConnected));
        assert!(rec.requests().is_empty());
    }

    #[test]
    fn test_fetch_schedule() {
        let rec = Recorder::default();
        rec.respond(Ok(ONE_DAY));
        let mut session = NetworkSession::new(FakeTransport::new(&rec));

        block_on(session.connect(&CREDS)).unwrap();
        let schedule = block_on(session.fetch_schedule(BASE)).unwrap();

        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.updated_at.as_deref(), Some("07:30"));
        assert_eq!(rec.requests(), vec!["10.0.0.2:8000/api/schedule/upcoming".to_string()]);
    }

    #[test]
    fn test_fetch_errors_unified() {
        let rec = Recorder::default();
        let mut session = NetworkSession::new(FakeTransport::new(&rec));
        block_on(session.connect(&CREDS)).unwrap();

        rec.respond(Err(HttpError::Status(500)));
        assert_eq!(
            block_on(session.fetch_schedule(BASE)),
            Err(FetchError::Http(HttpError::Status(500)))
        );

        rec.respond(Ok(r#"{"days":[{"date":"Mar 3""#));
        assert_eq!(
            block_on(session.fetch_schedule(BASE)),
            Err(FetchError::Decode(ScheduleError::Json))
        );

        rec.respond(Ok(r#"{"days":[]}"#));
        assert_eq!(
            block_on(session.fetch_schedule(BASE)),
            Err(FetchError::Decode(ScheduleError::Empty))
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let rec = Recorder::default();
        let mut session = NetworkSession::new(FakeTransport::new(&rec));
        block_on(session.connect(&CREDS)).unwrap();
        assert_eq!(
            block_on(session.fetch_schedule("https://planner.lan")),
            Err(FetchError::InvalidUrl)
        );
    }

    #[test]
    fn test_disconnect() {
        let rec = Recorder::default();
        let mut session = NetworkSession::new(FakeTransport::new(&rec));
        block_on(session.connect(&CREDS)).unwrap();
        block_on(session.disconnect());
        assert!(!session.is_connected());
    }
}
