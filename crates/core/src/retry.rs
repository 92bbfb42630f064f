use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Attempts allowed after the first when retries are enabled with `0`.
pub const DEFAULT_MAX_RETRIES: u32 = 4;

/// Longest single back-off when retries are enabled with a zero interval.
pub const DEFAULT_MAX_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// First back-off before the exponential curve kicks in.
pub const DEFAULT_BASE_INTERVAL: Duration = Duration::from_millis(100);

/// Default retry predicate for HTTP status codes: 429 and every 5xx except
/// 501.
pub fn default_retryable_status(status: u16) -> bool {
    status == 429 || ((500..600).contains(&status) && status != 501)
}

/// When and how long to wait before resending a failed request.
///
/// Disabled by default. Delays grow as `base * 2^attempt` with a
/// deterministic jitter and are clamped to `max_interval`. A parseable
/// `Retry-After` header on the failed response overrides the computed delay
/// (still clamped).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Whether failed requests are retried at all.
    pub enabled: bool,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Upper bound on a single back-off.
    pub max_interval: Duration,
    /// Delay before the first retry.
    pub base_interval: Duration,
    /// Decides which HTTP statuses are worth retrying.
    pub retryable_status: fn(u16) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            max_retries: DEFAULT_MAX_RETRIES,
            max_interval: DEFAULT_MAX_RETRY_INTERVAL,
            base_interval: DEFAULT_BASE_INTERVAL,
            retryable_status: default_retryable_status,
        }
    }
}

impl RetryPolicy {
    /// An enabled policy. Zero values select the defaults.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use scc_core::RetryPolicy;
    ///
    /// let policy = RetryPolicy::enabled(0, Duration::ZERO);
    /// assert_eq!(policy.max_retries, 4);
    /// assert_eq!(policy.max_interval, Duration::from_secs(30));
    /// ```
    pub fn enabled(max_retries: u32, max_interval: Duration) -> Self {
        Self {
            enabled: true,
            max_retries: if max_retries == 0 {
                DEFAULT_MAX_RETRIES
            } else {
                max_retries
            },
            max_interval: if max_interval.is_zero() {
                DEFAULT_MAX_RETRY_INTERVAL
            } else {
                max_interval
            },
            ..Self::default()
        }
    }

    /// Override the first back-off.
    #[must_use]
    pub fn with_base_interval(mut self, base: Duration) -> Self {
        self.base_interval = base;
        self
    }

    /// Total attempts a call may make, including the first.
    pub fn max_attempts(&self) -> u32 {
        if self.enabled { self.max_retries + 1 } else { 1 }
    }

    /// Whether a response with `status` should be retried.
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.enabled && (self.retryable_status)(status)
    }

    /// Computed delay for the zero-based retry `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base_secs = self.base_interval.as_secs_f64();
        // `attempt` is a small retry count, so the cast cannot wrap.
        #[allow(clippy::cast_possible_wrap)]
        let raw = base_secs * 2_f64.powi(attempt.min(30) as i32);
        // Vary by +0% to +40% so concurrent callers spread out.
        let jitter = 1.0 + 0.1 * f64::from(attempt % 5);
        Duration::from_secs_f64((raw * jitter).min(self.max_interval.as_secs_f64()))
    }

    /// Delay before retry `attempt`, honouring `Retry-After` when the failed
    /// response carried one.
    pub fn backoff(&self, attempt: u32, headers: Option<&HeaderMap>) -> Duration {
        headers
            .and_then(|h| retry_after(h, Utc::now()))
            .map_or_else(|| self.delay_for(attempt), |d| d.min(self.max_interval))
    }
}

/// Parse a `Retry-After` header given as delta-seconds or an HTTP-date.
pub fn retry_after(headers: &HeaderMap, now: DateTime<Utc>) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy::enabled(3, Duration::from_secs(60))
    }

    #[test]
    fn disabled_by_default() {
        let policy = RetryPolicy::default();
        assert!(!policy.enabled);
        assert_eq!(policy.max_attempts(), 1);
        assert!(!policy.should_retry_status(503));
    }

    #[test]
    fn zero_values_select_defaults() {
        let policy = RetryPolicy::enabled(0, Duration::ZERO);
        assert_eq!(policy.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(policy.max_interval, DEFAULT_MAX_RETRY_INTERVAL);
        assert_eq!(policy.max_attempts(), 5);
    }

    #[test]
    fn status_predicate() {
        let policy = policy();
        assert!(policy.should_retry_status(429));
        assert!(policy.should_retry_status(500));
        assert!(policy.should_retry_status(502));
        assert!(policy.should_retry_status(599));
        assert!(!policy.should_retry_status(501));
        assert!(!policy.should_retry_status(404));
        assert!(!policy.should_retry_status(200));
    }

    #[test]
    fn custom_predicate_replaces_default() {
        let mut policy = policy();
        policy.retryable_status = |s| s == 503;
        assert!(policy.should_retry_status(503));
        assert!(!policy.should_retry_status(500));
    }

    #[test]
    fn exponential_with_jitter() {
        let policy = policy();
        // attempt 0: 100ms * 1 * 1.0
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        // attempt 1: 200ms * 1.1
        assert_eq!(policy.delay_for(1), Duration::from_millis(220));
        // attempt 5: 3200ms * 1.0
        assert_eq!(policy.delay_for(5), Duration::from_millis(3200));
    }

    #[test]
    fn delay_is_clamped() {
        let policy = RetryPolicy::enabled(3, Duration::from_secs(1));
        assert_eq!(policy.delay_for(10), Duration::from_secs(1));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn retry_after_seconds_overrides() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, "7".parse().unwrap());
        assert_eq!(policy().backoff(0, Some(&headers)), Duration::from_secs(7));
    }

    #[test]
    fn retry_after_is_clamped() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, "600".parse().unwrap());
        assert_eq!(policy().backoff(0, Some(&headers)), Duration::from_secs(60));
    }

    #[test]
    fn retry_after_http_date() {
        let now = DateTime::parse_from_rfc2822("Wed, 21 Oct 2015 07:28:00 GMT")
            .unwrap()
            .with_timezone(&Utc);
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, "Wed, 21 Oct 2015 07:28:05 GMT".parse().unwrap());
        assert_eq!(retry_after(&headers, now), Some(Duration::from_secs(5)));

        headers.insert(RETRY_AFTER, "Wed, 21 Oct 2015 07:27:00 GMT".parse().unwrap());
        assert_eq!(retry_after(&headers, now), Some(Duration::ZERO));
    }

    #[test]
    fn unparseable_retry_after_falls_back() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, "soon".parse().unwrap());
        assert_eq!(policy().backoff(1, Some(&headers)), policy().delay_for(1));
    }
}
