//! Reading filter
//!
//! Rejects readings outside the rated range of the HC-SR04 and smooths the rest with
//! a moving median, which drops single spurious echoes without lagging real changes
//! the way an average would.

use moving_median::MovingMedian;

use crate::ranging::Distance;

/// Closest distance the sensor resolves reliably
pub const MIN_VALID_CM: f32 = 2.0;

/// Farthest distance the sensor is rated for
pub const MAX_VALID_CM: f32 = 400.0;

/// Range check plus median smoothing over the last `N` valid readings
pub struct ReadingFilter<const N: usize> {
    median: MovingMedian<f32, N>,
    min_cm: f32,
    max_cm: f32,
}

impl<const N: usize> Default for ReadingFilter<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ReadingFilter<N> {
    pub fn new() -> Self {
        Self::with_range(MIN_VALID_CM, MAX_VALID_CM)
    }

    pub fn with_range(min_cm: f32, max_cm: f32) -> Self {
        Self {
            median: MovingMedian::<f32, N>::new(),
            min_cm,
            max_cm,
        }
    }

    pub fn is_valid(&self, distance: Distance) -> bool {
        (self.min_cm..=self.max_cm).contains(&distance.centimeters())
    }

    /// Feeds a reading, returning the filtered distance or `None` if it was rejected
    pub fn accept(&mut self, distance: Distance) -> Option<Distance> {
        if !self.is_valid(distance) {
            return None;
        }
        self.median.add_value(distance.centimeters());
        Some(Distance::from_centimeters(self.median.median()))
    }

    /// Forgets the smoothing history, e.g. when a new recording starts
    pub fn reset(&mut self) {
        self.median = MovingMedian::<f32, N>::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cm(value: f32) -> Distance {
        Distance::from_centimeters(value)
    }

    #[test]
    fn rejects_out_of_range() {
        let mut filter = ReadingFilter::<3>::new();
        assert_eq!(filter.accept(cm(1.5)), None);
        assert_eq!(filter.accept(cm(400.5)), None);
        assert!(filter.is_valid(cm(2.0)));
        assert!(filter.is_valid(cm(400.0)));
    }

    #[test]
    fn median_drops_single_spike() {
        let mut filter = ReadingFilter::<3>::new();
        filter.accept(cm(10.0));
        filter.accept(cm(12.0));
        assert_eq!(filter.accept(cm(300.0)), Some(cm(12.0)));
    }

    #[test]
    fn rejected_readings_do_not_enter_the_window() {
        let mut filter = ReadingFilter::<3>::new();
        filter.accept(cm(20.0));
        filter.accept(cm(21.0));
        filter.accept(cm(0.5));
        assert_eq!(filter.accept(cm(22.0)), Some(cm(21.0)));
    }

    #[test]
    fn reset_forgets_earlier_readings() {
        let mut filter = ReadingFilter::<3>::new();
        filter.accept(cm(10.0));
        filter.accept(cm(12.0));
        filter.reset();
        assert_eq!(filter.accept(cm(150.0)), Some(cm(150.0)));
        assert_eq!(filter.accept(cm(152.0)), Some(cm(151.0)));
    }

    #[test]
    fn custom_range() {
        let filter = ReadingFilter::<3>::with_range(5.0, 50.0);
        assert!(!filter.is_valid(cm(4.0)));
        assert!(!filter.is_valid(cm(60.0)));
        assert!(filter.is_valid(cm(30.0)));
    }
}
