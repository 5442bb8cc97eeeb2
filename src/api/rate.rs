use std::time::Duration;

use reqwest::header::HeaderMap;

/// The response header advertising how many requests remain in the bucket.
const REMAINING_HEADER: &str = "X-RateLimit-Remaining";
/// The response header advertising when the bucket refills, in seconds.
const RESET_AFTER_HEADER: &str = "X-RateLimit-Reset-After";

/// Slack added on top of the advertised reset so the bucket has actually
/// refilled by the time the next request leaves.
const RESET_SLACK: Duration = Duration::from_secs(1);
/// The longest the client will ever wait on the budget's advice.
const MAX_WAIT: Duration = Duration::from_secs(60);

/// Proactive rate-limit accounting fed by response headers.
///
/// Every response's budget headers are recorded; before the next request the
/// client asks [`RateBudget::required_delay`] whether the bucket was reported
/// exhausted and sleeps accordingly. This avoids burning requests into 429s
/// rather than reacting to them.
#[derive(Clone, Copy, Debug, Default)]
pub struct RateBudget {
    remaining: Option<i64>,
    reset_after: Option<Duration>,
}

impl RateBudget {
    /// Creates an empty budget with no recorded advice.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the budget headers of a response, replacing earlier advice.
    #[allow(clippy::cast_possible_truncation)]
    pub fn record(&mut self, headers: &HeaderMap) {
        self.remaining = headers
            .get(REMAINING_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<f64>().ok())
            .map(|value| value.floor() as i64);

        self.reset_after = headers
            .get(RESET_AFTER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|seconds| *seconds >= 0.0)
            .map(Duration::from_secs_f64);
    }

    /// Returns how long the next request must wait, consuming the advice.
    ///
    /// A wait is required only when the bucket was reported empty alongside a
    /// reset interval; the returned delay includes the slack second and is
    /// capped at one minute.
    pub fn required_delay(&mut self) -> Option<Duration> {
        let exhausted = self.remaining.is_some_and(|remaining| remaining <= 0);
        let reset_after = self.reset_after?;

        if !exhausted {
            return None;
        }

        self.remaining = None;
        self.reset_after = None;

        Some((reset_after + RESET_SLACK).min(MAX_WAIT))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::header::{HeaderName, HeaderValue};

    use super::*;

    fn headers(remaining: &str, reset_after: &str) -> HeaderMap {
        let mut map = HeaderMap::new();

        map.insert(
            HeaderName::from_static("x-ratelimit-remaining"),
            HeaderValue::from_str(remaining).unwrap(),
        );
        map.insert(
            HeaderName::from_static("x-ratelimit-reset-after"),
            HeaderValue::from_str(reset_after).unwrap(),
        );

        map
    }

    #[test]
    fn exhausted_bucket_requires_wait() {
        let mut budget = RateBudget::new();

        budget.record(&headers("0", "2.5"));

        assert_eq!(budget.required_delay(), Some(Duration::from_secs_f64(3.5)));
        // The advice is consumed with the wait.
        assert_eq!(budget.required_delay(), None);
    }

    #[test]
    fn healthy_bucket_requires_no_wait() {
        let mut budget = RateBudget::new();

        budget.record(&headers("3", "2.5"));

        assert_eq!(budget.required_delay(), None);
    }

    #[test]
    fn missing_headers_require_no_wait() {
        let mut budget = RateBudget::new();

        budget.record(&HeaderMap::new());

        assert_eq!(budget.required_delay(), None);
    }

    #[test]
    fn wait_is_capped() {
        let mut budget = RateBudget::new();

        budget.record(&headers("0", "600"));

        assert_eq!(budget.required_delay(), Some(Duration::from_secs(60)));
    }
}
