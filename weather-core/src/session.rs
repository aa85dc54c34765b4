//! Reusable HTTP session with automatic retry for idempotent requests.
//!
//! Retries happen on:
//! - HTTP 429, 500, 502, 503, 504
//! - transport timeouts and connection failures
//!
//! Whatever the last attempt produced is handed back unclassified; turning it
//! into a [`WeatherError`](crate::WeatherError) is the caller's job.

use std::time::Duration;

use reqwest::{
    Client, Request, Response, StatusCode,
    header::{ACCEPT, HeaderMap, HeaderValue},
};
use serde::Serialize;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(120);

const USER_AGENT: &str = concat!("weather-cli/", env!("CARGO_PKG_VERSION"));

/// Status codes the session retries on its own.
pub const RETRY_STATUSES: [StatusCode; 5] = [
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    /// Delay before retry number `attempt + 1`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }

    /// Upper bound of time spent sleeping between attempts.
    pub fn total_backoff(&self) -> Duration {
        (0..self.max_retries).map(|n| self.delay_for_attempt(n)).sum()
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    RETRY_STATUSES.contains(&status)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Owned HTTP session: one connection pool per instance.
#[derive(Debug, Clone)]
pub struct HttpSession {
    client: Client,
    retry: RetryPolicy,
}

impl HttpSession {
    /// `timeout` bounds each individual attempt.
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        tracing::debug!(
            "HTTP session created with retry policy {retry:?} (at most {:?} of backoff)",
            retry.total_backoff()
        );
        Ok(Self { client, retry })
    }

    pub async fn get<Q>(&self, url: &str, query: &Q) -> Result<Response, reqwest::Error>
    where
        Q: Serialize + ?Sized,
    {
        let request = self.client.get(url).query(query).build()?;
        self.execute(request).await
    }

    /// Sends `request`, retrying per the policy when the method is idempotent
    /// and the request can be cloned.
    pub async fn execute(&self, request: Request) -> Result<Response, reqwest::Error> {
        if !request.method().is_idempotent() {
            return self.client.execute(request).await;
        }

        let mut attempt = 0;
        loop {
            let Some(current) = request.try_clone() else {
                return self.client.execute(request).await;
            };

            let result = self.client.execute(current).await;
            let retryable = match &result {
                Ok(response) => is_retryable_status(response.status()),
                Err(err) => is_retryable_error(err),
            };

            if !retryable || attempt >= self.retry.max_retries {
                if attempt > 0 && retryable {
                    tracing::warn!(
                        "Giving up on {} after {} attempts",
                        request.url().path(),
                        attempt + 1
                    );
                }
                return result;
            }

            let delay = self.retry.delay_for_attempt(attempt);
            match &result {
                Ok(response) => tracing::warn!(
                    "{} returned {}, retry {} of {} in {:?}",
                    request.url().path(),
                    response.status(),
                    attempt + 1,
                    self.retry.max_retries,
                    delay
                ),
                Err(err) => tracing::warn!(
                    "{} failed ({err}), retry {} of {} in {:?}",
                    request.url().path(),
                    attempt + 1,
                    self.retry.max_retries,
                    delay
                ),
            }

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_documented_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(500));
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.total_backoff(), Duration::from_millis(3500));
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
        };

        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_secs(1));
    }

    #[test]
    fn retry_status_list() {
        for status in [429, 500, 502, 503, 504] {
            let status = StatusCode::from_u16(status).expect("valid status");
            assert!(is_retryable_status(status), "{status}");
        }
        for status in [200, 400, 401, 404, 501] {
            let status = StatusCode::from_u16(status).expect("valid status");
            assert!(!is_retryable_status(status), "{status}");
        }
    }

    #[test]
    fn no_retry_policy() {
        let policy = RetryPolicy::none();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.total_backoff(), Duration::ZERO);
    }
}
