//! Range logger core
//!
//! Platform-independent logic for an HC-SR04 ultrasonic range logger that publishes
//! its readings over MQTT. Everything in here is `no_std` and talks to hardware only
//! through `embedded-hal` traits and [`clock::MonotonicClock`], so it runs unchanged on
//! the firmware and on the host test harness.
//!
//! # Modules
//! - [`clock`]: Monotonic microsecond time source
//! - [`ranging`]: Non-blocking trigger/echo state machine and HC-SR04 driver
//! - [`filter`]: Range validation and median smoothing of readings
//! - [`recorder`]: Recording session (experiment, sampling interval, sample log, CSV)
//! - [`command`]: Parser for commands arriving on the MQTT command topic
//! - [`telemetry`]: JSON payloads, topics and client ids for the broker
//! - [`keepalive`]: When a quiet broker session needs a heartbeat
//! - `mock`: Simulated pins, delay and clock for host tests (`mock` feature)

#![no_std]

pub mod clock;
pub mod command;
pub mod filter;
pub mod keepalive;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod ranging;
pub mod recorder;
pub mod telemetry;
