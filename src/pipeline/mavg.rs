//! Moving-average chunk-size estimator.

/// Window length for the moving average: two seconds of chunks at a
/// nominal 60 steps per second.
///
/// An exact integer relationship between simulated steps and audio
/// samples rarely holds, so the per-step chunk size jitters; a
/// multi-second horizon smooths it without chasing every excursion.
pub const MAVG_WINDOW: usize = 60 * 2;

/// Fixed-window moving average over reported chunk sizes.
///
/// Invariant: `avg()` always equals the arithmetic mean of the window.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    window: [usize; MAVG_WINDOW],
    pos: usize,
    avg: f64,
}

impl MovingAverage {
    /// Creates an estimator seeded with `value` in every slot.
    #[must_use]
    pub fn new(value: usize) -> Self {
        let mut mavg = Self {
            window: [0; MAVG_WINDOW],
            pos: 0,
            avg: 0.0,
        };
        mavg.seed(value);
        mavg
    }

    /// Fills the entire window with `value` and recomputes the mean.
    ///
    /// Used at init and whenever the reported frame rate diverges from
    /// the running average beyond tolerance - reseeding avoids the
    /// multi-second settling transient that `push` convergence would
    /// cost after an abrupt rate change.
    pub fn seed(&mut self, value: usize) {
        self.window = [value; MAVG_WINDOW];
        self.pos = 0;
        self.avg = value as f64;
    }

    /// Overwrites the oldest slot with `value` and recomputes the mean
    /// over the full window.
    pub fn push(&mut self, value: usize) {
        self.window[self.pos] = value;
        self.pos = (self.pos + 1) % MAVG_WINDOW;

        let sum: usize = self.window.iter().sum();
        self.avg = sum as f64 / MAVG_WINDOW as f64;
    }

    /// Current arithmetic mean of the window.
    #[inline]
    #[must_use]
    pub fn avg(&self) -> f64 {
        self.avg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_sets_avg_exactly() {
        let mavg = MovingAverage::new(1600);
        assert_eq!(mavg.avg(), 1600.0);
    }

    #[test]
    fn test_reseed_overrides_history() {
        let mut mavg = MovingAverage::new(1600);
        for _ in 0..10 {
            mavg.push(100);
        }
        mavg.seed(800);
        assert_eq!(mavg.avg(), 800.0);
    }

    #[test]
    fn test_push_tracks_window_mean() {
        let mut mavg = MovingAverage::new(0);
        mavg.push(MAVG_WINDOW); // mean rises by exactly 1
        assert_eq!(mavg.avg(), 1.0);
        mavg.push(MAVG_WINDOW);
        assert_eq!(mavg.avg(), 2.0);
    }

    #[test]
    fn test_full_window_replacement() {
        let mut mavg = MovingAverage::new(100);
        for _ in 0..MAVG_WINDOW {
            mavg.push(300);
        }
        assert_eq!(mavg.avg(), 300.0);
    }

    #[test]
    fn test_avg_equals_mean_of_recent_pushes() {
        let mut mavg = MovingAverage::new(0);
        let values: Vec<usize> = (0..MAVG_WINDOW).collect();
        for &v in &values {
            mavg.push(v);
        }
        let expected = values.iter().sum::<usize>() as f64 / MAVG_WINDOW as f64;
        assert_eq!(mavg.avg(), expected);
    }
}
