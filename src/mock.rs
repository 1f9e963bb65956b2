//! Test doubles shared by the unit tests
//!
//! Every fake holds a handle to one [`Recorder`], which keeps a single
//! ordered event log so tests can check cross-device ordering.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use core::convert::Infallible;
use embassy_time::{Duration, Instant};

use crate::battery::{BatteryMonitor, SensorError};
use crate::clock::Clock;
use crate::display::{Panel, PanelError};
use crate::framebuffer::Framebuffer;
use crate::http::{HttpError, Url};
use crate::input::{Button, ButtonPins};
use crate::network::{ConnectError, Credentials, Transport};
use crate::power::{Feedback, Indicator, PowerRails};

/// How long a scripted press holds the button down
const PRESS_HOLD: Duration = Duration::from_millis(200);

/// Clock that only moves when paused or advanced
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, duration: Duration) {
        self.micros.set(self.micros.get() + duration.as_micros());
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_micros(self.micros.get())
    }

    async fn pause(&mut self, duration: Duration) {
        self.advance(duration);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Aux(bool),
    Radio(bool),
    Indicator(Option<Feedback>),
    Join,
    Leave,
    /// `host:port/path`
    Request(String),
    /// Panel refresh start, in milliseconds
    Refresh(u64),
    PanelSleep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RailCall {
    Aux(bool),
    Radio(bool),
}

struct State {
    events: Vec<Event>,
    frames: Vec<Vec<u8>>,
    join_error: Option<ConnectError>,
    responses: VecDeque<Result<String, HttpError>>,
    panel_error: Option<PanelError>,
    voltage: Result<f32, SensorError>,
    battery_reads: usize,
    /// (button, pressed at ms)
    presses: Vec<(Button, u64)>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            frames: Vec::new(),
            join_error: None,
            responses: VecDeque::new(),
            panel_error: None,
            voltage: Ok(3.9),
            battery_reads: 0,
            presses: Vec::new(),
        }
    }
}

/// Shared script and log for all fakes of one test
#[derive(Clone, Default)]
pub struct Recorder {
    state: Rc<RefCell<State>>,
    clock: ManualClock,
}

impl Recorder {
    fn push(&self, event: Event) {
        self.state.borrow_mut().events.push(event);
    }

    pub fn clock(&self) -> ManualClock {
        self.clock.clone()
    }

    pub fn rails(&self) -> FakeRails {
        FakeRails { rec: self.clone() }
    }

    pub fn indicator(&self) -> FakeIndicator {
        FakeIndicator { rec: self.clone() }
    }

    pub fn panel(&self) -> FakePanel {
        FakePanel { rec: self.clone() }
    }

    pub fn buttons(&self) -> FakeButtons {
        FakeButtons { rec: self.clone() }
    }

    // Scripting

    /// Press `button` at `at_ms` on the shared clock
    pub fn press(&self, button: Button, at_ms: u64) {
        self.state.borrow_mut().presses.push((button, at_ms));
    }

    pub fn fail_join(&self, error: ConnectError) {
        self.state.borrow_mut().join_error = Some(error);
    }

    /// Queue the outcome of the next request; an empty queue fails to connect
    pub fn respond(&self, response: Result<&str, HttpError>) {
        self.state
            .borrow_mut()
            .responses
            .push_back(response.map(str::to_string));
    }

    pub fn fail_panel(&self, error: PanelError) {
        self.state.borrow_mut().panel_error = Some(error);
    }

    pub fn set_voltage(&self, voltage: Result<f32, SensorError>) {
        self.state.borrow_mut().voltage = voltage;
    }

    // Inspection

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn rail_calls(&self) -> Vec<RailCall> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Aux(on) => Some(RailCall::Aux(on)),
                Event::Radio(on) => Some(RailCall::Radio(on)),
                _ => None,
            })
            .collect()
    }

    pub fn aux_on(&self) -> bool {
        self.rail_calls()
            .into_iter()
            .rev()
            .find_map(|c| match c {
                RailCall::Aux(on) => Some(on),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn indicator_log(&self) -> Vec<Option<Feedback>> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Indicator(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    pub fn joins(&self) -> usize {
        self.events().iter().filter(|e| **e == Event::Join).count()
    }

    pub fn requests(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Request(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn refresh_times(&self) -> Vec<u64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Refresh(ms) => Some(ms),
                _ => None,
            })
            .collect()
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.state.borrow().frames.clone()
    }

    pub fn battery_reads(&self) -> usize {
        self.state.borrow().battery_reads
    }
}

impl BatteryMonitor for Recorder {
    fn read_voltage(&mut self) -> Result<f32, SensorError> {
        let mut state = self.state.borrow_mut();
        state.battery_reads += 1;
        state.voltage
    }
}

pub struct FakeRails {
    rec: Recorder,
}

impl PowerRails for FakeRails {
    async fn set_aux_power(&mut self, enabled: bool) {
        self.rec.push(Event::Aux(enabled));
    }

    async fn set_radio_power(&mut self, enabled: bool) {
        self.rec.push(Event::Radio(enabled));
    }
}

pub struct FakeIndicator {
    rec: Recorder,
}

impl Indicator for FakeIndicator {
    fn show(&mut self, feedback: Feedback) {
        self.rec.push(Event::Indicator(Some(feedback)));
    }

    fn clear(&mut self) {
        self.rec.push(Event::Indicator(None));
    }
}

/// Buttons held low for [`PRESS_HOLD`] from each scripted press
pub struct FakeButtons {
    rec: Recorder,
}

impl ButtonPins for FakeButtons {
    fn is_low(&mut self, button: Button) -> bool {
        let now = self.rec.clock.now().as_millis();
        let hold = PRESS_HOLD.as_millis();
        self.rec
            .state
            .borrow()
            .presses
            .iter()
            .any(|(b, at)| *b == button && *at <= now && now < at + hold)
    }
}

pub struct FakePanel {
    rec: Recorder,
}

impl Panel for FakePanel {
    async fn refresh(&mut self, frame: &Framebuffer) -> Result<(), PanelError> {
        if let Some(e) = self.rec.state.borrow().panel_error {
            return Err(e);
        }
        self.rec.push(Event::Refresh(self.rec.clock.now().as_millis()));
        self.rec.state.borrow_mut().frames.push(frame.as_slice().to_vec());
        Ok(())
    }

    async fn sleep(&mut self) -> Result<(), PanelError> {
        self.rec.push(Event::PanelSleep);
        Ok(())
    }
}

pub struct FakeTransport {
    rec: Recorder,
    connected: bool,
}

impl FakeTransport {
    pub fn new(rec: &Recorder) -> Self {
        Self {
            rec: rec.clone(),
            connected: false,
        }
    }
}

impl Transport for FakeTransport {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn join(&mut self, _credentials: &Credentials<'_>) -> Result<(), ConnectError> {
        self.rec.push(Event::Join);
        if let Some(e) = self.rec.state.borrow().join_error {
            return Err(e);
        }
        self.connected = true;
        Ok(())
    }

    async fn get(&mut self, url: &Url<'_>, buf: &mut [u8]) -> Result<usize, HttpError> {
        self.rec
            .push(Event::Request(format!("{}:{}{}", url.host, url.port, url.path)));
        let response = self.rec.state.borrow_mut().responses.pop_front();
        let body = response.unwrap_or(Err(HttpError::Connect))?;
        let bytes = body.as_bytes();
        if bytes.len() > buf.len() {
            return Err(HttpError::TooLarge);
        }
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(bytes.len())
    }

    async fn leave(&mut self) {
        self.rec.push(Event::Leave);
        self.connected = false;
    }
}

/// In-memory socket: reads replay the scripted chunks, writes are captured
pub struct ScriptedStream {
    chunks: VecDeque<Vec<u8>>,
    written: Vec<u8>,
}

impl ScriptedStream {
    pub fn new(chunks: &[&[u8]]) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_vec()).collect(),
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.written).into_owned()
    }
}

impl embedded_io_async::ErrorType for ScriptedStream {
    type Error = Infallible;
}

impl embedded_io_async::Read for ScriptedStream {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let Some(mut chunk) = self.chunks.pop_front() else {
            return Ok(0);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            self.chunks.push_front(chunk.split_off(n));
        }
        Ok(n)
    }
}

impl embedded_io_async::Write for ScriptedStream {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
