//! Orchestrator Module
//!
//! This module contains the main orchestrator task that runs the data logger by
//! handling system events, applying remote commands and deciding what gets published.
//!
//! # Responsibilities
//! - Owns the recorder; mirrors its recording flag and interval into the system state
//! - Records a sample for each reading while a recording is due
//! - Answers `READ_DISTANCE` with the next reading
//! - Publishes recorder status with sensor health after every change and the log on
//!   `EXPORT`
//! - Clears the reading filter when a recording starts
//! - Drops publications while the broker is unreachable

use core::fmt::Write;

use crate::system::config::SAMPLE_CAPACITY;
use crate::system::event::{self, Events};
use crate::system::publication::{self, Destination};
use crate::system::state::SYSTEM_STATE;
use crate::system::{indicator, measure};
use defmt::{debug, info, warn};
use embassy_time::Instant;
use sonar_logger::command::Command;
use sonar_logger::ranging::Distance;
use sonar_logger::recorder::{Recorder, CSV_HEADER};
use sonar_logger::telemetry::{self, ClientId, Health, Payload, TelemetryError};

type SampleRecorder = Recorder<SAMPLE_CAPACITY>;

/// Main orchestrator task
///
/// `device` is the broker client id, reported with command responses.
#[embassy_executor::task]
pub async fn orchestrate(device: ClientId) {
    info!("Orchestrator started");
    let mut recorder = SampleRecorder::new();
    loop {
        // wait for an event
        let event = event::wait().await;
        // update the shared state and if necessary, react to it
        if let Some(event) = process_event(event).await {
            handle_event(event, &mut recorder, &device).await;
        }
    }
}

/// Applies an event to the system state
///
/// Returns the event if it needs further handling.
async fn process_event(event: Events) -> Option<Events> {
    let mut state = SYSTEM_STATE.lock().await;

    match event {
        Events::DistanceMeasured(distance) => {
            state.last_distance_cm = Some(distance.whole_centimeters());
            Some(event)
        }
        Events::EchoTimedOut => {
            state.echo_timeouts = state.echo_timeouts.saturating_add(1);
            // an owed reading is answered by the next successful cycle
            state.reading_requested.then_some(event)
        }
        Events::CommandReceived(_) => Some(event),
        Events::WifiConnected(connected) => {
            if state.wifi_connected != connected {
                state.wifi_connected = connected;
                Some(event)
            } else {
                None
            }
        }
        Events::BrokerConnected(connected) => {
            if state.broker_connected != connected {
                state.broker_connected = connected;
                Some(event)
            } else {
                None
            }
        }
    }
}

async fn handle_event(event: Events, recorder: &mut SampleRecorder, device: &str) {
    match event {
        Events::DistanceMeasured(distance) => {
            handle_distance(distance, recorder, device).await;
        }
        Events::EchoTimedOut => {
            debug!("No echo, measuring again for pending request");
            measure::request();
        }
        Events::CommandReceived(command) => {
            info!("Handling command {}", command);
            handle_command(command, recorder).await;
        }
        Events::WifiConnected(connected) => {
            info!("WiFi connected: {}", connected);
        }
        Events::BrokerConnected(connected) => {
            info!("Broker connected: {}", connected);
            if connected {
                publish_status(recorder).await;
            }
        }
    }
}

async fn handle_distance(distance: Distance, recorder: &mut SampleRecorder, device: &str) {
    let now_ms = Instant::now().as_millis();
    let distance_cm = distance.whole_centimeters();

    let answer_owed = {
        let mut state = SYSTEM_STATE.lock().await;
        core::mem::replace(&mut state.reading_requested, false)
    };
    if answer_owed {
        let uptime_s = now_ms as f32 / 1000.0;
        publish(Destination::Data, telemetry::reading(device, uptime_s, distance_cm)).await;
    }

    if recorder.is_due(now_ms) {
        let sample = recorder.record(now_ms, distance);
        debug!("Recorded {}", sample);
        publish(Destination::Data, telemetry::sample(&sample)).await;
    }
}

async fn handle_command(command: Command, recorder: &mut SampleRecorder) {
    let now_ms = Instant::now().as_millis();
    match command {
        Command::ReadDistance => {
            SYSTEM_STATE.lock().await.reading_requested = true;
            measure::request();
            return;
        }
        Command::Led(on) => {
            indicator::send(on);
            return;
        }
        Command::Export => {
            export(recorder).await;
            return;
        }
        Command::StartReading => {
            recorder.start(now_ms);
            measure::reset_filter();
        }
        Command::StopReading => recorder.stop(),
        Command::Clear => recorder.clear(),
        Command::Status => {}
        Command::SetInterval(interval_ms) => {
            if let Err(e) = recorder.set_interval(interval_ms) {
                warn!("Interval not changed: {}", e);
            }
        }
        Command::SetExperiment(name) => {
            if let Err(e) = recorder.set_experiment(&name) {
                warn!("Experiment not changed: {}", e);
            }
        }
    }

    {
        let mut state = SYSTEM_STATE.lock().await;
        state.recording = recorder.is_recording();
        state.sample_interval_ms = recorder.interval_ms();
    }
    // the new interval applies from the next measurement on
    measure::request();
    publish_status(recorder).await;
}

/// Publishes the recorder status together with the sensor health counters
async fn publish_status(recorder: &SampleRecorder) {
    let health = {
        let state = SYSTEM_STATE.lock().await;
        Health {
            last_distance_cm: state.last_distance_cm,
            echo_timeouts: state.echo_timeouts,
        }
    };
    publish(Destination::Status, telemetry::status(&recorder.status(), &health)).await;
}

/// Publishes the file name, the header and then one message per recorded sample
async fn export(recorder: &SampleRecorder) {
    info!("Exporting {} samples", recorder.len());
    if recorder.dropped() > 0 {
        warn!("{} oldest samples were dropped", recorder.dropped());
    }

    if !publish(Destination::Csv, line(|out| out.write_str(&recorder.csv_filename()))).await
        || !publish(Destination::Csv, line(|out| out.write_str(CSV_HEADER))).await
    {
        return;
    }
    for (index, sample) in recorder.samples().enumerate() {
        if !publish(Destination::Csv, line(|out| sample.write_csv_row(out))).await {
            warn!("Export aborted after {} rows", index);
            return;
        }
    }
}

fn line(write: impl FnOnce(&mut Payload) -> core::fmt::Result) -> Result<Payload, TelemetryError> {
    let mut payload = Payload::new();
    write(&mut payload).map_err(|_| TelemetryError::PayloadTooLarge)?;
    Ok(payload)
}

/// Queues a payload for the broker, unless it is unreachable
///
/// Returns whether the payload was queued.
async fn publish(destination: Destination, payload: Result<Payload, TelemetryError>) -> bool {
    if !SYSTEM_STATE.lock().await.is_online() {
        debug!("Offline, not publishing to {}", destination);
        return false;
    }
    match payload {
        Ok(payload) => {
            let queued = publication::send(destination, payload).await;
            if !queued {
                warn!("Outgoing queue full, dropped message for {}", destination);
            }
            queued
        }
        Err(e) => {
            warn!("Payload for {} not built: {}", destination, e);
            false
        }
    }
}
