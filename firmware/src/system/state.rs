//! System State Management
//!
//! Global state shared between tasks. The recorder itself lives in the orchestrator;
//! the fields here mirror what other tasks need to see.
//!
//! # State Access Pattern
//! ```rust
//! let state = SYSTEM_STATE.lock().await;
//! // Read or modify state here
//! // Lock automatically released when state goes out of scope
//! ```

use defmt::Format;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use sonar_logger::recorder::DEFAULT_INTERVAL_MS;

/// Global system state protected by a mutex
pub static SYSTEM_STATE: Mutex<CriticalSectionRawMutex, SystemState> = Mutex::new(SystemState {
    wifi_connected: false,
    broker_connected: false,
    recording: false,
    sample_interval_ms: DEFAULT_INTERVAL_MS,
    reading_requested: false,
    last_distance_cm: None,
    echo_timeouts: 0,
});

#[derive(Format)]
pub struct SystemState {
    pub wifi_connected: bool,
    /// Publications are dropped while this is false
    pub broker_connected: bool,
    /// Mirrors the recorder, selects the measurement interval
    pub recording: bool,
    pub sample_interval_ms: u32,
    /// A `READ_DISTANCE` answer is owed with the next reading
    pub reading_requested: bool,
    /// Latest filtered reading in whole centimeters
    pub last_distance_cm: Option<u32>,
    /// Cycles without an echo since boot
    pub echo_timeouts: u32,
}

impl SystemState {
    /// Whether outgoing messages can be delivered
    pub fn is_online(&self) -> bool {
        self.wifi_connected && self.broker_connected
    }
}
