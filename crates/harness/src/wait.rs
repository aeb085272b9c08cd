use rand::Rng;
use std::time::Duration;

/// Pause a virtual user takes between two task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTime {
    Constant(Duration),
    /// Uniformly distributed in `[min, max]`.
    Between { min: Duration, max: Duration },
}

impl Default for WaitTime {
    fn default() -> Self {
        WaitTime::Constant(Duration::ZERO)
    }
}

impl WaitTime {
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        if min_ms >= max_ms {
            WaitTime::Constant(Duration::from_millis(min_ms))
        } else {
            WaitTime::Between {
                min: Duration::from_millis(min_ms),
                max: Duration::from_millis(max_ms),
            }
        }
    }

    pub fn next<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        match *self {
            WaitTime::Constant(wait) => wait,
            WaitTime::Between { min, max } => {
                let millis = rng.gen_range(min.as_millis()..=max.as_millis()) as u64;
                Duration::from_millis(millis)
            }
        }
    }
}
