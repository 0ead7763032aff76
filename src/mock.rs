//! Simulated hardware for host tests
//!
//! Everything shares one [`MockClock`] so a test can script a complete trigger/echo
//! exchange: move the clock, flip the echo line, poll, repeat. The pin handles borrow
//! their backing state, which lets the test keep observing a pin after handing the
//! handle to a driver.

use core::cell::{Cell, RefCell};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error, ErrorKind, ErrorType, InputPin, OutputPin};
use heapless::Vec;

use crate::clock::MonotonicClock;

/// Maximum number of trigger level changes kept by a [`TriggerLog`]
const TRIGGER_LOG_CAPACITY: usize = 64;

/// Error returned by a mock pin that was told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPinError;

impl Error for MockPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Clock whose time only moves when the test says so.
#[derive(Debug, Default)]
pub struct MockClock {
    now_us: Cell<u64>,
}

impl MockClock {
    pub const fn new() -> Self {
        Self {
            now_us: Cell::new(0),
        }
    }

    /// Jumps to an absolute time.
    pub fn set(&self, now_us: u64) {
        self.now_us.set(now_us);
    }

    /// Moves time forward by `us`.
    pub fn advance(&self, us: u64) {
        self.now_us.set(self.now_us.get() + us);
    }
}

impl MonotonicClock for MockClock {
    fn now_us(&self) -> u64 {
        self.now_us.get()
    }
}

/// Delay provider that either returns immediately or advances a [`MockClock`].
#[derive(Debug, Default)]
pub struct MockDelay<'a> {
    clock: Option<&'a MockClock>,
}

impl<'a> MockDelay<'a> {
    /// Delay that takes no simulated time.
    pub const fn new() -> Self {
        Self { clock: None }
    }

    /// Delay that advances `clock` by the requested duration.
    pub const fn advancing(clock: &'a MockClock) -> Self {
        Self { clock: Some(clock) }
    }
}

impl DelayNs for MockDelay<'_> {
    fn delay_ns(&mut self, ns: u32) {
        if let Some(clock) = self.clock {
            clock.advance(u64::from(ns.div_ceil(1_000)));
        }
    }

    fn delay_us(&mut self, us: u32) {
        if let Some(clock) = self.clock {
            clock.advance(u64::from(us));
        }
    }
}

/// Digital line level shared between a test and a [`MockEcho`] handle.
#[derive(Debug, Default)]
pub struct MockLine {
    high: Cell<bool>,
    faulty: Cell<bool>,
}

impl MockLine {
    pub const fn new() -> Self {
        Self {
            high: Cell::new(false),
            faulty: Cell::new(false),
        }
    }

    /// While faulty, every read through a [`MockEcho`] fails.
    pub fn set_faulty(&self, faulty: bool) {
        self.faulty.set(faulty);
    }

    pub fn set_high(&self) {
        self.high.set(true);
    }

    pub fn set_low(&self) {
        self.high.set(false);
    }

    pub fn is_high(&self) -> bool {
        self.high.get()
    }
}

/// Echo input reading a [`MockLine`].
#[derive(Debug, Clone, Copy)]
pub struct MockEcho<'a> {
    line: &'a MockLine,
}

impl<'a> MockEcho<'a> {
    pub const fn new(line: &'a MockLine) -> Self {
        Self { line }
    }
}

impl MockEcho<'_> {
    fn read(&self) -> Result<bool, MockPinError> {
        if self.line.faulty.get() {
            return Err(MockPinError);
        }
        Ok(self.line.is_high())
    }
}

impl ErrorType for MockEcho<'_> {
    type Error = MockPinError;
}

impl InputPin for MockEcho<'_> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.read()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.read().map(|high| !high)
    }
}

/// One recorded write to the trigger pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelChange {
    pub at_us: u64,
    pub high: bool,
}

/// Every level written to a [`MockTrigger`], timestamped with the shared clock.
#[derive(Debug, Default)]
pub struct TriggerLog {
    changes: RefCell<Vec<LevelChange, TRIGGER_LOG_CAPACITY>>,
    fail_writes: Cell<bool>,
}

impl TriggerLog {
    pub const fn new() -> Self {
        Self {
            changes: RefCell::new(Vec::new()),
            fail_writes: Cell::new(false),
        }
    }

    /// While set, writes through a [`MockTrigger`] fail and are not recorded.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Snapshot of the writes recorded so far.
    pub fn changes(&self) -> Vec<LevelChange, TRIGGER_LOG_CAPACITY> {
        self.changes.borrow().clone()
    }

    /// Number of low-to-high transitions, i.e. trigger pulses started.
    pub fn pulse_count(&self) -> usize {
        self.changes
            .borrow()
            .windows(2)
            .filter(|pair| !pair[0].high && pair[1].high)
            .count()
    }

    pub fn clear(&self) {
        self.changes.borrow_mut().clear();
    }

    fn push(&self, change: LevelChange) -> Result<(), MockPinError> {
        if self.fail_writes.get() {
            return Err(MockPinError);
        }
        // a full log keeps the oldest entries, tests clear it between cycles
        let _ = self.changes.borrow_mut().push(change);
        Ok(())
    }
}

/// Trigger output that records each write into a [`TriggerLog`].
#[derive(Debug, Clone, Copy)]
pub struct MockTrigger<'a> {
    clock: &'a MockClock,
    log: &'a TriggerLog,
}

impl<'a> MockTrigger<'a> {
    pub const fn new(clock: &'a MockClock, log: &'a TriggerLog) -> Self {
        Self { clock, log }
    }
}

impl ErrorType for MockTrigger<'_> {
    type Error = MockPinError;
}

impl OutputPin for MockTrigger<'_> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.log.push(LevelChange {
            at_us: self.clock.now_us(),
            high: false,
        })
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.log.push(LevelChange {
            at_us: self.clock.now_us(),
            high: true,
        })
    }
}
