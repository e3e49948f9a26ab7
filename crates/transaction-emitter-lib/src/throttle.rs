// Copyright © Aptos Foundation
// SPDX-License-Identifier: Apache-2.0

use crate::counters::THROTTLE_SLEEPS;
use anyhow::{Result, bail};
use std::time::Duration;
use stress_logger::prelude::*;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

pub const THROTTLE_WINDOW: Duration = Duration::from_secs(1);

/// Admits at most `tps` submissions per fixed one-second window.
///
/// Once the budget of the current window is spent, the next `acquire` sleeps
/// until the window ends and opens a new one. A window that ran out on its
/// own is replaced without sleeping.
#[derive(Debug)]
pub struct FixedWindowThrottle {
    tps: usize,
    sent: usize,
    window_start: Instant,
}

impl FixedWindowThrottle {
    pub fn new(tps: usize) -> Self {
        Self {
            tps: tps.max(1),
            sent: 0,
            window_start: Instant::now(),
        }
    }

    /// Waits until one more submission fits in the current window.
    pub async fn acquire(&mut self, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            bail!("Cancelled");
        }

        let now = Instant::now();
        let window_end = self.window_start + THROTTLE_WINDOW;
        if now >= window_end {
            self.reset(now);
        } else if self.sent >= self.tps {
            THROTTLE_SLEEPS.inc();
            sample!(
                SampleRate::Duration(Duration::from_secs(10)),
                debug!(
                    "Broadcast reached {} tps, waiting {:?} for the next window",
                    self.tps,
                    window_end - now
                )
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => bail!("Cancelled while throttled"),
                _ = sleep_until(window_end) => {},
            }
            self.reset(Instant::now());
        }

        self.sent += 1;
        Ok(())
    }

    pub fn tps(&self) -> usize {
        self.tps
    }

    fn reset(&mut self, now: Instant) {
        self.sent = 0;
        self.window_start = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::{assert_err, assert_ok};

    async fn acquire_n(throttle: &mut FixedWindowThrottle, n: usize) {
        let cancel = CancellationToken::new();
        for _ in 0..n {
            assert_ok!(throttle.acquire(&cancel).await);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_budget_then_sleep() {
        let start = Instant::now();
        let mut throttle = FixedWindowThrottle::new(10);

        acquire_n(&mut throttle, 10).await;
        assert_eq!(start.elapsed(), Duration::ZERO);

        acquire_n(&mut throttle, 1).await;
        assert_eq!(start.elapsed(), THROTTLE_WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_window_resets_without_sleep() {
        let mut throttle = FixedWindowThrottle::new(10);
        acquire_n(&mut throttle, 5).await;

        tokio::time::advance(Duration::from_millis(1500)).await;
        let after_gap = Instant::now();
        acquire_n(&mut throttle, 10).await;
        assert_eq!(after_gap.elapsed(), Duration::ZERO);

        acquire_n(&mut throttle, 1).await;
        assert_eq!(after_gap.elapsed(), THROTTLE_WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_bound() {
        let start = Instant::now();
        let mut throttle = FixedWindowThrottle::new(100);
        acquire_n(&mut throttle, 250).await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2), "{:?}", elapsed);
        assert!(elapsed <= Duration::from_millis(3500), "{:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_window_exceeds_budget() {
        let cancel = CancellationToken::new();
        let start = Instant::now();
        let mut throttle = FixedWindowThrottle::new(100);
        let mut per_second = vec![0usize; 4];
        for _ in 0..350 {
            assert_ok!(throttle.acquire(&cancel).await);
            per_second[start.elapsed().as_secs() as usize] += 1;
            // a submission costs a little time
            tokio::time::advance(Duration::from_millis(3)).await;
        }
        assert_eq!(per_second, vec![100, 100, 100, 50]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let cancel = CancellationToken::new();
        let mut throttle = FixedWindowThrottle::new(1);
        assert_ok!(throttle.acquire(&cancel).await);

        let start = Instant::now();
        cancel.cancel();
        assert_err!(throttle.acquire(&cancel).await);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
