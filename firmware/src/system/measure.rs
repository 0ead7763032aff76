//! Measurement requests
//!
//! Wakes the distance task early, e.g. to answer a `READ_DISTANCE` command without
//! waiting out the idle interval. A new recording also asks the task to drop its
//! smoothing history so the first samples are not blended with older readings.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

static MEASURE_SIGNAL: Signal<CriticalSectionRawMutex, ()> = Signal::new();
static FILTER_RESET_SIGNAL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Requests a measurement as soon as possible
pub fn request() {
    MEASURE_SIGNAL.signal(());
}

/// Waits for the next measurement request
pub async fn wait() {
    MEASURE_SIGNAL.wait().await
}

/// Asks the distance task to reset its reading filter before the next reading
pub fn reset_filter() {
    FILTER_RESET_SIGNAL.signal(());
}

/// Whether a filter reset was requested since the last call
pub fn take_filter_reset() -> bool {
    FILTER_RESET_SIGNAL.try_take().is_some()
}
