//! Broker payloads
//!
//! JSON documents published to the broker, plus topic and client id helpers. All
//! buffers are fixed size; anything that does not fit is reported as an error instead
//! of being truncated.
//!
//! # Payloads
//! ```text
//! sample:   {"distance":31,"timestamp":0.05,"experiment":"Percobaan 1"}
//! reading:  {"distance":31,"timestamp":12.5,"device":"pico2w-3fa2","command_response":true}
//! presence: {"message":"Device connected","device":"pico2w-3fa2","status":"online"}
//! status:   {"recording":true,"samples":120,"experiment":"Percobaan 1","interval_ms":50,
//!            "last_distance":31,"echo_timeouts":2}
//! ```

use core::fmt::{self, Write};

use serde::Serialize;

use crate::recorder::{Sample, Status};

/// Largest JSON payload produced here
pub const PAYLOAD_CAPACITY: usize = 256;

/// Longest topic produced by [`topic`]
pub const TOPIC_CAPACITY: usize = 64;

/// Longest client id produced by [`client_id`]
pub const CLIENT_ID_CAPACITY: usize = 32;

pub type Payload = serde_json_core::heapless::String<PAYLOAD_CAPACITY>;
pub type Topic = heapless::String<TOPIC_CAPACITY>;
pub type ClientId = heapless::String<CLIENT_ID_CAPACITY>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TelemetryError {
    /// Serialized document larger than [`PAYLOAD_CAPACITY`]
    PayloadTooLarge,
    /// Topic or client id longer than its buffer
    NameTooLong,
}

impl fmt::Display for TelemetryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryError::PayloadTooLarge => {
                write!(f, "payload exceeds {} bytes", PAYLOAD_CAPACITY)
            }
            TelemetryError::NameTooLong => write!(f, "topic or client id too long"),
        }
    }
}

/// Sensor health reported next to the recorder status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Health {
    /// Latest filtered reading, `None` before the first echo
    pub last_distance_cm: Option<u32>,
    /// Cycles that ended without an echo since boot
    pub echo_timeouts: u32,
}

#[derive(Serialize)]
struct SampleDocument<'a> {
    distance: u32,
    timestamp: f32,
    experiment: &'a str,
}

#[derive(Serialize)]
struct ReadingDocument<'a> {
    distance: u32,
    timestamp: f32,
    device: &'a str,
    command_response: bool,
}

#[derive(Serialize)]
struct PresenceDocument<'a> {
    message: &'a str,
    device: &'a str,
    status: &'a str,
}

#[derive(Serialize)]
struct StatusDocument<'a> {
    recording: bool,
    samples: usize,
    experiment: &'a str,
    interval_ms: u32,
    last_distance: Option<u32>,
    echo_timeouts: u32,
}

fn to_payload<T: Serialize>(document: &T) -> Result<Payload, TelemetryError> {
    serde_json_core::to_string(document).map_err(|_| TelemetryError::PayloadTooLarge)
}

/// Recorded sample, published while a recording runs
pub fn sample(sample: &Sample) -> Result<Payload, TelemetryError> {
    to_payload(&SampleDocument {
        distance: sample.distance_cm,
        timestamp: sample.timestamp_s,
        experiment: &sample.experiment,
    })
}

/// Answer to a `READ_DISTANCE` command, `uptime_s` is seconds since boot
pub fn reading(device: &str, uptime_s: f32, distance_cm: u32) -> Result<Payload, TelemetryError> {
    to_payload(&ReadingDocument {
        distance: distance_cm,
        timestamp: uptime_s,
        device,
        command_response: true,
    })
}

/// Connection announcement; the offline variant is registered as last will
pub fn presence(device: &str, online: bool) -> Result<Payload, TelemetryError> {
    let (message, status) = if online {
        ("Device connected", "online")
    } else {
        ("Device disconnected", "offline")
    };
    to_payload(&PresenceDocument {
        message,
        device,
        status,
    })
}

/// Recorder snapshot, published in answer to `STATUS` and after settings change
///
/// `last_distance` is `null` until the sensor has seen an echo.
pub fn status(status: &Status, health: &Health) -> Result<Payload, TelemetryError> {
    to_payload(&StatusDocument {
        recording: status.recording,
        samples: status.samples,
        experiment: &status.experiment,
        interval_ms: status.interval_ms,
        last_distance: health.last_distance_cm,
        echo_timeouts: health.echo_timeouts,
    })
}

/// `<root>/<suffix>`
pub fn topic(root: &str, suffix: &str) -> Result<Topic, TelemetryError> {
    let mut topic = Topic::new();
    write!(topic, "{}/{}", root, suffix).map_err(|_| TelemetryError::NameTooLong)?;
    Ok(topic)
}

/// `<prefix>-<suffix as lowercase hex>`, the suffix keeps ids unique per boot
pub fn client_id(prefix: &str, suffix: u16) -> Result<ClientId, TelemetryError> {
    let mut id = ClientId::new();
    write!(id, "{}-{:x}", prefix, suffix).map_err(|_| TelemetryError::NameTooLong)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::ExperimentName;

    fn name(value: &str) -> ExperimentName {
        let mut name = ExperimentName::new();
        name.push_str(value).unwrap();
        name
    }

    #[test]
    fn sample_document() {
        let payload = sample(&Sample {
            timestamp_s: 1.5,
            distance_cm: 30,
            experiment: name("Percobaan 1"),
        })
        .unwrap();
        assert!(payload.starts_with("{\"distance\":30,\"timestamp\":"));
        assert!(payload.ends_with(",\"experiment\":\"Percobaan 1\"}"));
    }

    #[test]
    fn reading_document_flags_command_response() {
        let payload = reading("pico2w-1a", 2.0, 17).unwrap();
        assert!(payload.starts_with("{\"distance\":17,"));
        assert!(payload.ends_with("\"device\":\"pico2w-1a\",\"command_response\":true}"));
    }

    #[test]
    fn presence_documents() {
        assert_eq!(
            presence("pico2w-1a", true).unwrap().as_str(),
            "{\"message\":\"Device connected\",\"device\":\"pico2w-1a\",\"status\":\"online\"}"
        );
        assert_eq!(
            presence("pico2w-1a", false).unwrap().as_str(),
            "{\"message\":\"Device disconnected\",\"device\":\"pico2w-1a\",\"status\":\"offline\"}"
        );
    }

    #[test]
    fn status_document() {
        let health = Health {
            last_distance_cm: Some(31),
            echo_timeouts: 2,
        };
        let payload = status(
            &Status {
                recording: true,
                samples: 120,
                experiment: name("Bounce"),
                interval_ms: 50,
            },
            &health,
        )
        .unwrap();
        assert_eq!(
            payload.as_str(),
            "{\"recording\":true,\"samples\":120,\"experiment\":\"Bounce\",\"interval_ms\":50,\
             \"last_distance\":31,\"echo_timeouts\":2}"
        );
    }

    #[test]
    fn status_before_first_echo() {
        let payload = status(
            &Status {
                recording: false,
                samples: 0,
                experiment: name("Bounce"),
                interval_ms: 50,
            },
            &Health {
                last_distance_cm: None,
                echo_timeouts: 7,
            },
        )
        .unwrap();
        assert!(payload.ends_with(",\"last_distance\":null,\"echo_timeouts\":7}"));
    }

    #[test]
    fn longest_status_fits() {
        // every character escaped doubles the name on the wire
        let mut quotes = ExperimentName::new();
        while quotes.push('"').is_ok() {}
        let payload = status(
            &Status {
                recording: false,
                samples: usize::MAX,
                experiment: quotes,
                interval_ms: u32::MAX,
            },
            &Health {
                last_distance_cm: Some(u32::MAX),
                echo_timeouts: u32::MAX,
            },
        );
        assert!(payload.is_ok());
    }

    #[test]
    fn experiment_names_are_escaped() {
        let payload = status(
            &Status {
                recording: false,
                samples: 0,
                experiment: name("say \"hi\""),
                interval_ms: 10,
            },
            &Health::default(),
        )
        .unwrap();
        assert!(payload.contains("\"experiment\":\"say \\\"hi\\\"\""));
    }

    #[test]
    fn topics_and_ids() {
        assert_eq!(topic("sensor/distance", "cmd").unwrap().as_str(), "sensor/distance/cmd");
        assert_eq!(client_id("pico2w", 0xbeef).unwrap().as_str(), "pico2w-beef");
    }

    #[test]
    fn oversized_names_are_rejected() {
        let root = "range-logger/laboratory-bench-number-seven/ultrasonic/hc-sr04";
        assert_eq!(topic(root, "cmd"), Err(TelemetryError::NameTooLong));
        assert_eq!(
            client_id("a-client-prefix-that-is-too-long", 1),
            Err(TelemetryError::NameTooLong)
        );
    }
}
