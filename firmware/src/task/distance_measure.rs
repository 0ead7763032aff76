//! Distance sensor handling
//!
//! Measures distances with the HC-SR04 ultrasonic sensor.
//!
//! # Sensor Operation
//! - The driver is polled step by step; the task yields between polls so other tasks
//!   keep running while the echo is in flight
//! - A cycle ends with a distance or with a timeout after 30ms without echo
//! - Sound speed is corrected for a fixed ambient temperature
//!
//! # Signal Processing
//! - Readings outside 2..=400cm are discarded
//! - A moving median over the last readings drops single spurious echoes
//! - The median window is cleared when a new recording starts
//!
//! # Scheduling
//! - While recording, a measurement is taken every sample interval
//! - Otherwise every idle interval, or right away on request

use crate::system::config::{AMBIENT_TEMPERATURE_C, IDLE_MEASUREMENT_INTERVAL, MEDIAN_WINDOW_SIZE};
use crate::system::event::{send, Events};
use crate::system::measure;
use crate::system::resources::DistanceSensorResources;
use crate::system::state::SYSTEM_STATE;
use defmt::{debug, error, info};
use embassy_futures::select::select;
use embassy_futures::yield_now;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_time::{Delay, Duration, Instant, Timer};
use sonar_logger::clock::MonotonicClock;
use sonar_logger::filter::ReadingFilter;
use sonar_logger::ranging::{Hcsr04, Ranging, RangingConfig};

/// Monotonic time since boot from the embassy time driver
struct UptimeClock;

impl MonotonicClock for UptimeClock {
    fn now_us(&self) -> u64 {
        Instant::now().as_micros()
    }
}

/// Main distance measurement task
#[embassy_executor::task]
pub async fn distance_measure(r: DistanceSensorResources) {
    let trigger = Output::new(r.trigger_pin, Level::Low);
    let echo = Input::new(r.echo_pin, Pull::None);
    let config = RangingConfig::for_temperature(AMBIENT_TEMPERATURE_C);
    let mut sensor = Hcsr04::new(trigger, echo, Delay, UptimeClock, config);
    let mut filter = ReadingFilter::<MEDIAN_WINDOW_SIZE>::new();
    info!(
        "Distance sensor ready, timeout {}us, {}cm/us",
        sensor.config().timeout_us,
        sensor.config().sound_speed_cm_per_us
    );

    loop {
        let outcome = loop {
            match sensor.poll() {
                Ok(outcome) if outcome.is_pending() => yield_now().await,
                Ok(outcome) => break outcome,
                Err(e) => {
                    error!("Ranging failed: {}", e);
                    break Ranging::TimedOut;
                }
            }
        };

        if measure::take_filter_reset() {
            debug!("New recording, clearing median window");
            filter.reset();
        }
        match outcome {
            Ranging::Measured(distance) => match filter.accept(distance) {
                Some(filtered) => send(Events::DistanceMeasured(filtered)).await,
                None => debug!("Discarded out of range reading {}cm", distance.centimeters()),
            },
            _ => send(Events::EchoTimedOut).await,
        }

        select(Timer::after(next_interval().await), measure::wait()).await;
    }
}

/// Sample interval while recording, idle interval otherwise
async fn next_interval() -> Duration {
    let state = SYSTEM_STATE.lock().await;
    if state.recording {
        Duration::from_millis(u64::from(state.sample_interval_ms))
    } else {
        IDLE_MEASUREMENT_INTERVAL
    }
}
