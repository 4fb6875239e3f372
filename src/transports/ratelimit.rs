use std::time::{Duration, SystemTime};

/// How long sending stays disabled when the server rate limits us
/// without a usable `Retry-After` value.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Upper bound on any retry window; absurd header values clamp here so
/// the deadline arithmetic cannot overflow.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(24 * 60 * 60);

/// Tracks the rate limit the server asked us to honor.
///
/// While a limit is active, queued events are discarded instead of
/// sent. Only the global (whole-DSN) limit is tracked.
#[derive(Debug, Default)]
pub struct RateLimiter {
    disabled_until: Option<SystemTime>,
}

impl RateLimiter {
    /// Creates a new rate limiter with no active limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates the limit from a `Retry-After` header value.
    ///
    /// The header is either a number of seconds or an HTTP date;
    /// anything else counts as [`DEFAULT_RETRY_AFTER`].
    pub fn update_from_retry_after(&mut self, header: &str) {
        let duration = if let Ok(value) = header.parse::<f64>() {
            if value >= 0.0 {
                Duration::from_secs(value.ceil() as u64)
            } else {
                DEFAULT_RETRY_AFTER
            }
        } else if let Ok(date) = httpdate::parse_http_date(header) {
            date.duration_since(SystemTime::now())
                .unwrap_or(Duration::ZERO)
        } else {
            DEFAULT_RETRY_AFTER
        };
        self.disabled_until = Some(SystemTime::now() + duration.min(MAX_RETRY_AFTER));
    }

    /// Updates the limit from a `429` response that carried no
    /// `Retry-After` header.
    pub fn update_from_429(&mut self) {
        self.disabled_until = Some(SystemTime::now() + DEFAULT_RETRY_AFTER);
    }

    /// If sending is currently disabled, returns how long the limit
    /// still lasts.
    pub fn is_disabled(&self) -> Option<Duration> {
        let disabled_until = self.disabled_until?;
        disabled_until.duration_since(SystemTime::now()).ok()
    }
}
