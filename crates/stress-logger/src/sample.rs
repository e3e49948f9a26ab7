// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

//! Rate limiting for hot-path log lines.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

/// How often a `sample!` body runs.
#[derive(Clone, Copy, Debug)]
pub enum SampleRate {
    /// At most once per window. Whole seconds only.
    Duration(Duration),
    /// The first of every `n` calls.
    Frequency(u64),
    Always,
}

/// Per-call-site state behind `sample!`.
///
/// For `Frequency` the state counts the calls left until the next sample; for
/// `Duration` it holds the unix second of the last sample.
pub struct Sampling {
    rate: SampleRate,
    state: AtomicU64,
}

impl Sampling {
    pub const fn new(rate: SampleRate) -> Self {
        Self {
            rate,
            state: AtomicU64::new(0),
        }
    }

    /// Whether this call should run.
    pub fn sample(&self) -> bool {
        match self.rate {
            SampleRate::Always => true,
            SampleRate::Frequency(every) => self
                .state
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |remaining| {
                    Some(match remaining {
                        0 => every.saturating_sub(1),
                        remaining => remaining - 1,
                    })
                })
                .map_or(false, |remaining| remaining == 0),
            SampleRate::Duration(window) => {
                let now = unix_seconds();
                self.state
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                        (last == 0 || now.saturating_sub(last) >= window.as_secs()).then_some(now)
                    })
                    .is_ok()
            },
        }
    }
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

/// Runs the given statements at most at `SampleRate`, keeping one `Sampling`
/// per call site.
///
/// ```
/// use std::time::Duration;
/// use stress_logger::{SampleRate, sample};
///
/// for _ in 0..1000 {
///     sample!(SampleRate::Duration(Duration::from_secs(10)), tracing::info!("busy"));
/// }
/// ```
#[macro_export]
macro_rules! sample {
    ($sample_rate:expr, $($args:expr)+ ,) => {
        $crate::sample!($sample_rate, $($args)+);
    };

    ($sample_rate:expr, $($args:tt)+) => {{
        static SAMPLING: $crate::sample::Sampling = $crate::sample::Sampling::new($sample_rate);
        if SAMPLING.sample() {
            $($args)+
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampled(sampling: &Sampling, calls: usize) -> Vec<usize> {
        (0..calls).filter(|_| sampling.sample()).collect()
    }

    #[test]
    fn test_frequency() {
        let sampling = Sampling::new(SampleRate::Frequency(10));
        assert_eq!(sampled(&sampling, 26), vec![0, 10, 20]);

        let sampling = Sampling::new(SampleRate::Frequency(1));
        assert_eq!(sampled(&sampling, 3), vec![0, 1, 2]);
    }

    #[test]
    fn test_always() {
        let sampling = Sampling::new(SampleRate::Always);
        assert_eq!(sampled(&sampling, 5), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_duration() {
        let sampling = Sampling::new(SampleRate::Duration(Duration::from_secs(3600)));
        assert_eq!(sampled(&sampling, 100), vec![0]);
    }

    #[test]
    fn test_macro_keeps_state_per_call_site() {
        let mut first = 0;
        let mut second = 0;
        for _ in 0..4 {
            sample!(SampleRate::Frequency(2), { first += 1 });
            sample!(SampleRate::Frequency(4), { second += 1 });
        }
        assert_eq!((first, second), (2, 1));
    }
}
