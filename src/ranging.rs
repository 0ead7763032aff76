//! Non-blocking ultrasonic ranging
//!
//! Measures distance with an HC-SR04 style sensor without ever busy-waiting for the echo.
//! Each call to [`RangingSession::poll`] does a bounded amount of work and returns
//! immediately, so the caller can interleave ranging with network I/O on a single
//! cooperative executor.
//!
//! # Measurement Cycle
//! ```text
//!            ┌──────────── timeout (> 30 ms since trigger) ───────────┐
//!            v                                                        │
//!  Idle ──trigger pulse──> AwaitingEchoRise ──echo high──> AwaitingEchoFall ──echo low──> Measured
//! ```
//! - Trigger pulse: low, 2µs, high, 10µs, low
//! - Distance = echo pulse width (µs) * speed of sound (cm/µs) / 2
//! - The timeout covers the whole cycle, a stuck-high echo line times out as well
//!
//! # Outcomes
//! - [`Ranging::Pending`]: nothing to report yet, poll again on the next iteration
//! - [`Ranging::TimedOut`]: no echo completed in time; the next poll starts a new cycle
//! - [`Ranging::Measured`]: distance of the completed cycle

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::clock::MonotonicClock;

/// Round-trip time after which a cycle is abandoned (HC-SR04 rated range is ~4m)
pub const DEFAULT_TIMEOUT_US: u64 = 30_000;

/// Speed of sound at roughly 15°C
pub const DEFAULT_SOUND_SPEED_CM_PER_US: f32 = 0.034;

/// Low time before the trigger pulse so it starts from a clean edge
const TRIGGER_SETTLE_US: u32 = 2;

/// Minimum trigger high time required by the sensor
const TRIGGER_PULSE_US: u32 = 10;

/// Calibration of the distance conversion and cycle timeout
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RangingConfig {
    /// Cycle is abandoned once more than this has elapsed since the trigger
    pub timeout_us: u64,
    /// Speed of sound in centimeters per microsecond
    pub sound_speed_cm_per_us: f32,
}

impl Default for RangingConfig {
    fn default() -> Self {
        Self {
            timeout_us: DEFAULT_TIMEOUT_US,
            sound_speed_cm_per_us: DEFAULT_SOUND_SPEED_CM_PER_US,
        }
    }
}

impl RangingConfig {
    /// Configuration with the speed of sound compensated for air temperature
    ///
    /// ```text
    /// c(T) = 331.3 m/s * sqrt(1 + T / 273.15)
    /// ```
    pub fn for_temperature(celsius: f32) -> Self {
        let meters_per_second = 331.3 * libm::sqrtf(1.0 + celsius / 273.15);
        Self {
            sound_speed_cm_per_us: meters_per_second / 10_000.0,
            ..Self::default()
        }
    }

    /// Converts a round-trip echo width into a one-way distance
    pub fn distance_for(&self, echo_width_us: u64) -> Distance {
        Distance::from_centimeters(echo_width_us as f32 * self.sound_speed_cm_per_us / 2.0)
    }
}

/// One-way distance to the reflecting object
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Distance(f32);

impl Distance {
    pub const fn from_centimeters(cm: f32) -> Self {
        Self(cm)
    }

    pub const fn centimeters(self) -> f32 {
        self.0
    }

    /// Distance truncated to whole centimeters, the resolution that gets published
    pub fn whole_centimeters(self) -> u32 {
        // float to int casts saturate, negative input is impossible but maps to 0
        self.0 as u32
    }
}

/// Result of a single poll
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ranging {
    /// Trigger just sent or echo still outstanding
    Pending,
    /// No echo completed within the timeout, nothing in range or a wiring fault
    TimedOut,
    /// Completed cycle
    Measured(Distance),
}

impl Ranging {
    pub fn is_pending(&self) -> bool {
        matches!(self, Ranging::Pending)
    }

    pub fn distance(&self) -> Option<Distance> {
        match self {
            Ranging::Measured(distance) => Some(*distance),
            _ => None,
        }
    }
}

/// Where the current cycle stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// No trigger outstanding, the next poll fires one
    Idle,
    /// Trigger sent, echo line has not gone high yet
    AwaitingEchoRise,
    /// Echo line high, waiting for it to drop
    AwaitingEchoFall,
}

/// Pin failures reported by the HAL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangingError<T, E> {
    /// Writing the trigger pin failed
    Trigger(T),
    /// Reading the echo pin failed
    Echo(E),
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Display for RangingError<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangingError::Trigger(e) => write!(f, "trigger pin write failed: {:?}", e),
            RangingError::Echo(e) => write!(f, "echo pin read failed: {:?}", e),
        }
    }
}

#[cfg(feature = "defmt")]
impl<T, E> defmt::Format for RangingError<T, E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            RangingError::Trigger(_) => defmt::write!(f, "trigger pin write failed"),
            RangingError::Echo(_) => defmt::write!(f, "echo pin read failed"),
        }
    }
}

/// Timing state of one trigger/echo cycle, reused for every cycle of a sensor
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RangingSession {
    trigger_sent: bool,
    trigger_time_us: u64,
    pulse_started: bool,
    pulse_start_us: u64,
}

impl RangingSession {
    pub const fn new() -> Self {
        Self {
            trigger_sent: false,
            trigger_time_us: 0,
            pulse_started: false,
            pulse_start_us: 0,
        }
    }

    pub fn trigger_sent(&self) -> bool {
        self.trigger_sent
    }

    pub fn pulse_started(&self) -> bool {
        self.pulse_started
    }

    pub fn phase(&self) -> Phase {
        match (self.trigger_sent, self.pulse_started) {
            (false, _) => Phase::Idle,
            (true, false) => Phase::AwaitingEchoRise,
            (true, true) => Phase::AwaitingEchoFall,
        }
    }

    /// Advances the cycle by one step
    ///
    /// Checks run in a fixed order: fire the trigger if idle, record a rising echo,
    /// finish on a falling echo, then give up once the timeout has passed.
    pub fn poll<T, E, D, C>(
        &mut self,
        trigger: &mut T,
        echo: &mut E,
        delay: &mut D,
        clock: &C,
        config: &RangingConfig,
    ) -> Result<Ranging, RangingError<T::Error, E::Error>>
    where
        T: OutputPin,
        E: InputPin,
        D: DelayNs,
        C: MonotonicClock,
    {
        if !self.trigger_sent {
            send_trigger_pulse(trigger, delay).map_err(RangingError::Trigger)?;
            self.trigger_time_us = clock.now_us();
            self.trigger_sent = true;
            self.pulse_started = false;
            return Ok(Ranging::Pending);
        }

        let echo_high = echo.is_high().map_err(RangingError::Echo)?;
        let now = clock.now_us();

        if echo_high && !self.pulse_started {
            self.pulse_start_us = now;
            self.pulse_started = true;
            return Ok(Ranging::Pending);
        }

        if !echo_high && self.pulse_started {
            let echo_width_us = now.saturating_sub(self.pulse_start_us);
            self.trigger_sent = false;
            return Ok(Ranging::Measured(config.distance_for(echo_width_us)));
        }

        if now.saturating_sub(self.trigger_time_us) > config.timeout_us {
            self.trigger_sent = false;
            return Ok(Ranging::TimedOut);
        }

        Ok(Ranging::Pending)
    }
}

/// Drives the trigger line through low, 2µs, high, 10µs, low
fn send_trigger_pulse<T: OutputPin, D: DelayNs>(trigger: &mut T, delay: &mut D) -> Result<(), T::Error> {
    trigger.set_low()?;
    delay.delay_us(TRIGGER_SETTLE_US);
    trigger.set_high()?;
    delay.delay_us(TRIGGER_PULSE_US);
    trigger.set_low()
}

/// HC-SR04 sensor owning its pins, delay, clock and ranging session
pub struct Hcsr04<T, E, D, C> {
    trigger: T,
    echo: E,
    delay: D,
    clock: C,
    config: RangingConfig,
    session: RangingSession,
}

impl<T, E, D, C> Hcsr04<T, E, D, C>
where
    T: OutputPin,
    E: InputPin,
    D: DelayNs,
    C: MonotonicClock,
{
    pub fn new(trigger: T, echo: E, delay: D, clock: C, config: RangingConfig) -> Self {
        Self {
            trigger,
            echo,
            delay,
            clock,
            config,
            session: RangingSession::new(),
        }
    }

    /// Advances the measurement by one step, see [`RangingSession::poll`]
    pub fn poll(&mut self) -> Result<Ranging, RangingError<T::Error, E::Error>> {
        self.session.poll(
            &mut self.trigger,
            &mut self.echo,
            &mut self.delay,
            &self.clock,
            &self.config,
        )
    }

    pub fn session(&self) -> &RangingSession {
        &self.session
    }

    pub fn config(&self) -> &RangingConfig {
        &self.config
    }

    /// Replaces the calibration, takes effect on the next completed cycle
    pub fn set_config(&mut self, config: RangingConfig) {
        self.config = config;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{
        MockClock, MockDelay, MockEcho, MockLine, MockPinError, MockTrigger, TriggerLog,
    };

    struct Rig {
        clock: MockClock,
        line: MockLine,
        log: TriggerLog,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                clock: MockClock::new(),
                line: MockLine::new(),
                log: TriggerLog::new(),
            }
        }

        fn try_poll(
            &self,
            session: &mut RangingSession,
        ) -> Result<Ranging, RangingError<MockPinError, MockPinError>> {
            let mut trigger = MockTrigger::new(&self.clock, &self.log);
            let mut echo = MockEcho::new(&self.line);
            let mut delay = MockDelay::new();
            session.poll(&mut trigger, &mut echo, &mut delay, &self.clock, &RangingConfig::default())
        }

        fn poll(&self, session: &mut RangingSession) -> Ranging {
            self.try_poll(session).unwrap()
        }
    }

    #[test]
    fn first_poll_fires_trigger() {
        let rig = Rig::new();
        let mut session = RangingSession::new();

        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(rig.poll(&mut session), Ranging::Pending);
        assert_eq!(session.phase(), Phase::AwaitingEchoRise);
        assert_eq!(rig.log.pulse_count(), 1);
    }

    #[test]
    fn rising_edge_is_recorded_once() {
        let rig = Rig::new();
        let mut session = RangingSession::new();
        rig.poll(&mut session);

        rig.clock.set(150);
        rig.line.set_high();
        assert_eq!(rig.poll(&mut session), Ranging::Pending);
        assert_eq!(session.phase(), Phase::AwaitingEchoFall);

        // a later poll with the line still high must not move the start time
        rig.clock.set(400);
        assert_eq!(rig.poll(&mut session), Ranging::Pending);
        rig.clock.set(750);
        rig.line.set_low();
        let distance = rig.poll(&mut session).distance().unwrap();
        assert!((distance.centimeters() - 600.0 * 0.017).abs() < 1e-3);
    }

    #[test]
    fn falling_edge_ends_cycle() {
        let rig = Rig::new();
        let mut session = RangingSession::new();
        rig.poll(&mut session);
        rig.clock.set(100);
        rig.line.set_high();
        rig.poll(&mut session);
        rig.clock.set(1_100);
        rig.line.set_low();

        assert!(matches!(rig.poll(&mut session), Ranging::Measured(_)));
        assert_eq!(session.phase(), Phase::Idle);
        assert!(!session.trigger_sent());
    }

    #[test]
    fn timeout_is_strictly_after_limit() {
        let rig = Rig::new();
        let mut session = RangingSession::new();
        rig.poll(&mut session);

        rig.clock.set(DEFAULT_TIMEOUT_US);
        assert_eq!(rig.poll(&mut session), Ranging::Pending);
        rig.clock.set(DEFAULT_TIMEOUT_US + 1);
        assert_eq!(rig.poll(&mut session), Ranging::TimedOut);
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn echo_stuck_high_times_out() {
        let rig = Rig::new();
        let mut session = RangingSession::new();
        rig.poll(&mut session);
        rig.clock.set(10);
        rig.line.set_high();
        rig.poll(&mut session);

        rig.clock.set(30_011);
        assert_eq!(rig.poll(&mut session), Ranging::TimedOut);

        // next cycle starts clean even though the line is still high
        rig.clock.set(30_012);
        assert_eq!(rig.poll(&mut session), Ranging::Pending);
        assert!(!session.pulse_started());
        assert_eq!(rig.log.pulse_count(), 2);
    }

    #[test]
    fn low_echo_without_rise_keeps_waiting() {
        let rig = Rig::new();
        let mut session = RangingSession::new();
        rig.poll(&mut session);
        let before = session;

        rig.clock.set(5_000);
        assert_eq!(rig.poll(&mut session), Ranging::Pending);
        assert_eq!(session, before);
    }

    #[test]
    fn failed_trigger_write_retriggers_next_poll() {
        let rig = Rig::new();
        let mut session = RangingSession::new();

        rig.log.set_fail_writes(true);
        assert_eq!(
            rig.try_poll(&mut session),
            Err(RangingError::Trigger(MockPinError))
        );
        assert!(!session.trigger_sent());
        assert_eq!(session.phase(), Phase::Idle);

        rig.log.set_fail_writes(false);
        assert_eq!(rig.poll(&mut session), Ranging::Pending);
        assert!(session.trigger_sent());
        assert_eq!(rig.log.pulse_count(), 1);
    }

    #[test]
    fn failed_echo_read_leaves_session_untouched() {
        let rig = Rig::new();
        let mut session = RangingSession::new();
        rig.poll(&mut session);
        rig.clock.set(100);
        rig.line.set_high();
        rig.poll(&mut session);
        let before = session;

        rig.clock.set(700);
        rig.line.set_low();
        rig.line.set_faulty(true);
        assert_eq!(rig.try_poll(&mut session), Err(RangingError::Echo(MockPinError)));
        assert_eq!(session, before);

        // the fall is still seen once the pin reads again
        rig.line.set_faulty(false);
        let distance = rig.poll(&mut session).distance().unwrap();
        assert!((distance.centimeters() - 600.0 * 0.017).abs() < 1e-3);
    }

    #[test]
    fn temperature_compensation() {
        let warm = RangingConfig::for_temperature(20.0);
        assert!((warm.sound_speed_cm_per_us - 0.03432).abs() < 1e-4);
        assert_eq!(warm.timeout_us, DEFAULT_TIMEOUT_US);

        let cold = RangingConfig::for_temperature(-10.0);
        assert!(cold.sound_speed_cm_per_us < warm.sound_speed_cm_per_us);
    }

    #[test]
    fn whole_centimeters_truncate() {
        assert_eq!(Distance::from_centimeters(30.6).whole_centimeters(), 30);
        assert_eq!(Distance::from_centimeters(0.4).whole_centimeters(), 0);
    }
}
