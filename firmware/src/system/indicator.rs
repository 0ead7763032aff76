//! Status LED requests
//!
//! The on-board LED hangs off the wireless chip, so the task owning the chip control
//! applies the requests sent here.
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

/// Latest requested LED level, older requests are overwritten
pub static LED_REQUESTED: Signal<CriticalSectionRawMutex, bool> = Signal::new();

/// Requests the LED on (`true`) or off
pub fn send(on: bool) {
    LED_REQUESTED.signal(on);
}

/// Waits for the next LED request
pub async fn wait() -> bool {
    LED_REQUESTED.wait().await
}
