//! Remote commands
//!
//! Plain-text commands received on the MQTT command topic.
//!
//! | Payload             | Command                     |
//! |---------------------|-----------------------------|
//! | `READ_DISTANCE`     | publish the next reading    |
//! | `START_READING`     | start a new recording       |
//! | `STOP_READING`      | stop recording              |
//! | `CLEAR`             | drop recorded samples       |
//! | `STATUS`            | publish the recorder status |
//! | `EXPORT`            | publish the log as CSV rows |
//! | `INTERVAL:<ms>`     | change the sample interval  |
//! | `EXPERIMENT:<name>` | change the experiment name  |
//! | anything else       | LED on if it starts with `1`, off otherwise |

use core::fmt;

use crate::recorder::ExperimentName;

const READ_DISTANCE: &[u8] = b"READ_DISTANCE";
const START_READING: &[u8] = b"START_READING";
const STOP_READING: &[u8] = b"STOP_READING";
const CLEAR: &[u8] = b"CLEAR";
const STATUS: &[u8] = b"STATUS";
const EXPORT: &[u8] = b"EXPORT";
const INTERVAL_PREFIX: &[u8] = b"INTERVAL:";
const EXPERIMENT_PREFIX: &[u8] = b"EXPERIMENT:";

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    ReadDistance,
    StartReading,
    StopReading,
    Clear,
    Status,
    Export,
    SetInterval(u32),
    SetExperiment(ExperimentName),
    /// Status LED on (`true`) or off
    Led(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Payload was empty after trimming whitespace
    Empty,
    /// `INTERVAL:` not followed by a number of milliseconds
    InvalidInterval,
    /// `EXPERIMENT:` name not UTF-8 or too long
    InvalidExperimentName,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => write!(f, "empty command"),
            CommandError::InvalidInterval => write!(f, "interval is not a number of milliseconds"),
            CommandError::InvalidExperimentName => write!(f, "invalid experiment name"),
        }
    }
}

impl Command {
    pub fn parse(payload: &[u8]) -> Result<Self, CommandError> {
        let payload = payload.trim_ascii();
        if payload.is_empty() {
            return Err(CommandError::Empty);
        }

        match payload {
            READ_DISTANCE => return Ok(Command::ReadDistance),
            START_READING => return Ok(Command::StartReading),
            STOP_READING => return Ok(Command::StopReading),
            CLEAR => return Ok(Command::Clear),
            STATUS => return Ok(Command::Status),
            EXPORT => return Ok(Command::Export),
            _ => {}
        }

        if let Some(value) = payload.strip_prefix(INTERVAL_PREFIX) {
            return core::str::from_utf8(value)
                .ok()
                .and_then(|value| value.trim().parse::<u32>().ok())
                .map(Command::SetInterval)
                .ok_or(CommandError::InvalidInterval);
        }

        if let Some(value) = payload.strip_prefix(EXPERIMENT_PREFIX) {
            let name = core::str::from_utf8(value)
                .map_err(|_| CommandError::InvalidExperimentName)?
                .trim();
            let mut experiment = ExperimentName::new();
            experiment
                .push_str(name)
                .map_err(|_| CommandError::InvalidExperimentName)?;
            return Ok(Command::SetExperiment(experiment));
        }

        Ok(Command::Led(payload[0] == b'1'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords() {
        assert_eq!(Command::parse(b"READ_DISTANCE"), Ok(Command::ReadDistance));
        assert_eq!(Command::parse(b"START_READING"), Ok(Command::StartReading));
        assert_eq!(Command::parse(b"STOP_READING\n"), Ok(Command::StopReading));
        assert_eq!(Command::parse(b"CLEAR"), Ok(Command::Clear));
        assert_eq!(Command::parse(b" STATUS "), Ok(Command::Status));
        assert_eq!(Command::parse(b"EXPORT"), Ok(Command::Export));
    }

    #[test]
    fn interval() {
        assert_eq!(Command::parse(b"INTERVAL:100"), Ok(Command::SetInterval(100)));
        assert_eq!(Command::parse(b"INTERVAL: 250"), Ok(Command::SetInterval(250)));
        assert_eq!(Command::parse(b"INTERVAL:fast"), Err(CommandError::InvalidInterval));
        assert_eq!(Command::parse(b"INTERVAL:-5"), Err(CommandError::InvalidInterval));
    }

    #[test]
    fn experiment() {
        let Ok(Command::SetExperiment(name)) = Command::parse(b"EXPERIMENT:Drop 3") else {
            panic!("expected experiment command");
        };
        assert_eq!(name.as_str(), "Drop 3");

        assert_eq!(
            Command::parse(b"EXPERIMENT:\xff\xfe"),
            Err(CommandError::InvalidExperimentName)
        );
        assert_eq!(
            Command::parse(b"EXPERIMENT:0123456789012345678901234567890123456789"),
            Err(CommandError::InvalidExperimentName)
        );
    }

    #[test]
    fn led_fallback() {
        assert_eq!(Command::parse(b"1"), Ok(Command::Led(true)));
        assert_eq!(Command::parse(b"1on"), Ok(Command::Led(true)));
        assert_eq!(Command::parse(b"0"), Ok(Command::Led(false)));
        assert_eq!(Command::parse(b"read_distance"), Ok(Command::Led(false)));
    }

    #[test]
    fn empty_payload() {
        assert_eq!(Command::parse(b""), Err(CommandError::Empty));
        assert_eq!(Command::parse(b"  \r\n"), Err(CommandError::Empty));
    }
}
