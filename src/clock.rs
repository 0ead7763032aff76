//! Monotonic time source
//!
//! The ranging state machine timestamps edges with a free-running microsecond counter.
//! Firmware backs this with `embassy_time::Instant`, tests with [`crate::mock::MockClock`].

/// Monotonically increasing microsecond counter supplied by the platform.
pub trait MonotonicClock {
    /// Microseconds since an arbitrary, fixed origin (usually boot).
    fn now_us(&self) -> u64;

    /// Microseconds elapsed since `reference_us`, saturating at zero.
    fn elapsed_since(&self, reference_us: u64) -> u64 {
        self.now_us().saturating_sub(reference_us)
    }
}

impl<C: MonotonicClock + ?Sized> MonotonicClock for &C {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}
