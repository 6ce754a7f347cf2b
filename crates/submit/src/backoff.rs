use std::time::Duration;

use rand::Rng;

/// Exponential backoff with full jitter.
///
/// The delay before retry `n` is drawn uniformly from
/// `[0, min(max, base * 2^(n-1))]`, so concurrent submitters that failed
/// together spread their retries out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Upper bound of the delay before retry `retry` (1-based).
    pub fn ceiling(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base.saturating_mul(1 << exponent).min(self.max)
    }

    /// Draws the delay before retry `retry` (1-based).
    pub fn delay<R: Rng + ?Sized>(&self, retry: u32, rng: &mut R) -> Duration {
        let ceiling = u64::try_from(self.ceiling(retry).as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rng.random_range(0..=ceiling))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(8))
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn ceiling_doubles_until_capped() {
        let backoff = Backoff::new(Duration::from_millis(100), Duration::from_millis(1000));
        let ceilings: Vec<_> = (1..=6).map(|n| backoff.ceiling(n).as_millis()).collect();
        assert_eq!(ceilings, vec![100, 200, 400, 800, 1000, 1000]);
    }

    #[test]
    fn huge_retry_counts_do_not_overflow() {
        let backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(30));
        assert_eq!(backoff.ceiling(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn delay_stays_within_ceiling() {
        let backoff = Backoff::new(Duration::from_millis(50), Duration::from_millis(400));
        let mut rng = StdRng::seed_from_u64(7);
        for retry in 1..=10 {
            for _ in 0..100 {
                assert!(backoff.delay(retry, &mut rng) <= backoff.ceiling(retry));
            }
        }
    }

    #[test]
    fn delay_is_jittered() {
        let backoff = Backoff::new(Duration::from_millis(1000), Duration::from_secs(8));
        let mut rng = StdRng::seed_from_u64(42);
        let delays: std::collections::HashSet<_> =
            (0..20).map(|_| backoff.delay(3, &mut rng)).collect();
        assert!(delays.len() > 1);
    }

    #[test]
    fn zero_base_means_no_delay() {
        let backoff = Backoff::new(Duration::ZERO, Duration::from_secs(1));
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(backoff.delay(5, &mut rng), Duration::ZERO);
    }
}
