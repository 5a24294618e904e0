//! Size products and time budgets.
use std::time::{Duration, Instant};

/// Whether `a * b` stays within `limit`, without overflowing.
///
/// A product that does not fit the integer range cannot be within any
/// limit, so overflow simply reports `false`.
pub fn is_product_within_limit(a: u64, b: u64, limit: u64) -> bool {
    match a.checked_mul(b) {
        Some(product) => product <= limit,
        None => false,
    }
}

/// Wall clock countdown used to bound a run.
pub struct CountdownTimer {
    start: Instant,
    limit: Option<Duration>,
}

impl CountdownTimer {
    /// Starts a countdown over `max_time` seconds.
    ///
    /// Non-finite values disable the limit.
    pub fn new(max_time: f64) -> CountdownTimer {
        let limit = if max_time.is_finite() {
            Some(Duration::from_secs_f64(max_time.max(0.0)))
        } else {
            None
        };
        CountdownTimer {
            start: Instant::now(),
            limit,
        }
    }

    /// Whether the countdown has run out.
    pub fn is_expired(&self) -> bool {
        match self.limit {
            Some(limit) => self.start.elapsed() >= limit,
            None => false,
        }
    }

    /// Time passed since the countdown started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn products_within_limit() {
        assert!(is_product_within_limit(1000, 1000, 1_000_000));
        assert!(!is_product_within_limit(1000, 1001, 1_000_000));
        assert!(is_product_within_limit(0, u64::MAX, 0));
    }

    #[test]
    fn overflowing_products_are_rejected() {
        assert!(!is_product_within_limit(u64::MAX, 2, u64::MAX));
        assert!(is_product_within_limit(u64::MAX, 1, u64::MAX));
    }

    #[test]
    fn zero_budget_expires_immediately() {
        let timer = CountdownTimer::new(0.0);
        assert!(timer.is_expired());
    }

    #[test]
    fn unlimited_budget_never_expires() {
        let timer = CountdownTimer::new(f64::INFINITY);
        assert!(!timer.is_expired());
    }
}
