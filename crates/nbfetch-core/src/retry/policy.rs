use std::time::Duration;

/// What went wrong, as far as retrying is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    /// 429 or 503.
    Throttled,
    /// Dropped, refused or unresolvable connection, or a body cut short.
    Connection,
    /// Any other 5xx.
    ServerError(u32),
    /// Permanent: 4xx, bad range answers, storage failures, cancellation.
    Permanent,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorKind::Permanent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    NoRetry,
    RetryAfter(Duration),
}

/// Per-request retry budget with capped exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one. Never zero.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_retries(3, Duration::from_millis(250), Duration::from_secs(30))
    }
}

impl RetryPolicy {
    /// `retries` further attempts after the first.
    pub fn from_retries(retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: retries.saturating_add(1),
            base_delay,
            max_delay,
        }
    }

    /// Wait before attempt `failed + 1`: `base * 2^(failed - 1)`, at most `max_delay`.
    pub fn backoff(&self, failed: u32) -> Duration {
        let shift = failed.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }

    /// `attempt` is the 1-based number of the attempt that just failed.
    pub fn decide(&self, attempt: u32, kind: ErrorKind) -> RetryDecision {
        if attempt >= self.max_attempts || !kind.is_retryable() {
            RetryDecision::NoRetry
        } else {
            RetryDecision::RetryAfter(self.backoff(attempt))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn permanent_errors_stop_at_once() {
        let p = RetryPolicy::default();
        assert_eq!(p.decide(1, ErrorKind::Permanent), RetryDecision::NoRetry);
    }

    #[test]
    fn default_budget_matches_config_defaults() {
        let p = RetryPolicy::default();
        assert_eq!(p.max_attempts, 4);
        assert_eq!(p.base_delay, ms(250));
        assert_eq!(p.max_delay, Duration::from_secs(30));
    }

    #[test]
    fn backoff_doubles_then_caps() {
        let p = RetryPolicy::from_retries(50, ms(100), ms(1000));
        let delays: Vec<_> = (1..=6).map(|n| p.backoff(n)).collect();
        assert_eq!(delays, vec![ms(100), ms(200), ms(400), ms(800), ms(1000), ms(1000)]);
        assert_eq!(p.backoff(40), ms(1000));
    }

    #[test]
    fn budget_counts_the_first_attempt() {
        let p = RetryPolicy::from_retries(2, ms(10), Duration::from_secs(1));
        assert_eq!(p.decide(1, ErrorKind::Throttled), RetryDecision::RetryAfter(ms(10)));
        assert_eq!(p.decide(2, ErrorKind::ServerError(502)), RetryDecision::RetryAfter(ms(20)));
        assert_eq!(p.decide(3, ErrorKind::Connection), RetryDecision::NoRetry);
    }

    #[test]
    fn zero_retries_means_single_attempt() {
        let p = RetryPolicy::from_retries(0, ms(10), Duration::from_secs(1));
        assert_eq!(p.decide(1, ErrorKind::Timeout), RetryDecision::NoRetry);
    }
}
