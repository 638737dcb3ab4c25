use tokio::time::{sleep, Duration};

use crate::circleci::client::SourceApi;
use crate::config::ExportConfig;
use crate::error::{Error, Result};

/// A successful response body together with the quota left after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub body: String,
    pub remaining: u32,
}

/// Issues GETs against the source API, retrying failed attempts and backing
/// off whenever the provider reports an exhausted quota.
pub struct RateLimitedRequester<'a> {
    api: &'a dyn SourceApi,
    max_attempts: u32,
    cooldown: Duration,
    throttle_budget: Duration,
}

impl<'a> RateLimitedRequester<'a> {
    pub fn new(api: &'a dyn SourceApi, config: &ExportConfig) -> Self {
        Self {
            api,
            max_attempts: config.max_attempts,
            cooldown: config.cooldown,
            throttle_budget: config.throttle_budget,
        }
    }

    /// Fetches `endpoint` until a non-empty body arrives.
    ///
    /// Ordinary failures (transport errors, a missing or unparsable
    /// `X-Ratelimit-Remaining`, an error status, an unreadable or empty body)
    /// each use up one of `max_attempts`. A response reporting zero remaining
    /// quota is discarded and followed by a cool-down; those do not use up
    /// attempts but the total cool-down time is capped by `throttle_budget`.
    pub async fn fetch(&self, endpoint: &str) -> Result<Fetched> {
        let attempts = self.max_attempts;
        let mut failures = 0;
        let mut throttled = Duration::ZERO;

        while failures < attempts {
            let attempt = failures + 1;

            let response = match self.api.get(endpoint).await {
                Ok(response) => response,
                Err(e) if e.is_retryable() => {
                    tracing::error!("[{}/{}] error sending HTTP request: {}", attempt, attempts, e);
                    failures += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let remaining = match response
                .rate_limit_remaining
                .as_deref()
                .and_then(|v| v.trim().parse::<u32>().ok())
            {
                Some(remaining) => remaining,
                None => {
                    tracing::error!(
                        "[{}/{}] error reading the rate limit: {:?}",
                        attempt,
                        attempts,
                        response.rate_limit_remaining
                    );
                    failures += 1;
                    continue;
                }
            };

            if remaining == 0 {
                if throttled + self.cooldown > self.throttle_budget {
                    return Err(Error::ThrottleTimeout(self.throttle_budget, endpoint.to_string()));
                }
                tracing::warn!(
                    "[{}/{}] drained the rate limit, waiting {:?}",
                    attempt,
                    attempts,
                    self.cooldown
                );
                sleep(self.cooldown).await;
                throttled += self.cooldown;
                continue;
            }

            if !response.status.is_success() {
                let body = response.body.unwrap_or_default();
                tracing::error!(
                    "[{}/{}] CircleCI API returned {}: {}",
                    attempt,
                    attempts,
                    response.status,
                    body
                );
                failures += 1;
                continue;
            }

            match response.body {
                Ok(body) if !body.is_empty() => return Ok(Fetched { body, remaining }),
                Ok(_) => {
                    tracing::error!("[{}/{}] empty HTTP response", attempt, attempts);
                }
                Err(e) => {
                    tracing::error!("[{}/{}] error reading HTTP response: {}", attempt, attempts, e);
                }
            }
            failures += 1;
        }

        Err(Error::RetriesExhausted {
            endpoint: endpoint.to_string(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circleci::client::{MockSourceApi, SourceResponse};
    use mockall::Sequence;
    use reqwest::StatusCode;
    use tokio::time::Instant;

    fn response(remaining: Option<&str>, body: &str) -> SourceResponse {
        SourceResponse {
            status: StatusCode::OK,
            rate_limit_remaining: remaining.map(str::to_string),
            body: Ok(body.to_string()),
        }
    }

    fn io_error() -> Error {
        Error::Io(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_first_non_empty_body() {
        let mut api = MockSourceApi::new();
        api.expect_get().times(1).returning(|endpoint: &str| {
            assert_eq!(endpoint, "project/gh/org/repo/pipeline");
            Ok(response(Some("42"), "{\"items\": []}"))
        });

        let config = ExportConfig::default();
        let requester = RateLimitedRequester::new(&api, &config);
        let fetched = requester.fetch("project/gh/org/repo/pipeline").await.unwrap();

        assert_eq!(fetched.body, "{\"items\": []}");
        assert_eq!(fetched.remaining, 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_quota_discards_body_and_waits() {
        let mut api = MockSourceApi::new();
        let mut seq = Sequence::new();
        api.expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(Some("0"), "throttled body")));
        api.expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(Some("99"), "fresh body")));

        let config = ExportConfig::default();
        let requester = RateLimitedRequester::new(&api, &config);
        let started = Instant::now();
        let fetched = requester.fetch("endpoint").await.unwrap();

        assert_eq!(fetched.body, "fresh body");
        assert!(started.elapsed() >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttling_does_not_use_attempts() {
        let mut api = MockSourceApi::new();
        let mut seq = Sequence::new();
        api.expect_get()
            .times(3)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(Some("0"), "throttled")));
        api.expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(Some("5"), "ok")));

        let config = ExportConfig {
            max_attempts: 2,
            ..ExportConfig::default()
        };
        let requester = RateLimitedRequester::new(&api, &config);

        assert_eq!(requester.fetch("endpoint").await.unwrap().body, "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_budget_exceeded() {
        let mut api = MockSourceApi::new();
        api.expect_get()
            .times(4)
            .returning(|_| Ok(response(Some("0"), "throttled")));

        let config = ExportConfig {
            throttle_budget: Duration::from_secs(180),
            ..ExportConfig::default()
        };
        let requester = RateLimitedRequester::new(&api, &config);

        let err = requester.fetch("endpoint").await.unwrap_err();
        assert!(matches!(err, Error::ThrottleTimeout(budget, _) if budget == Duration::from_secs(180)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let mut api = MockSourceApi::new();
        api.expect_get().times(10).returning(|_| Err(io_error()));

        let config = ExportConfig::default();
        let requester = RateLimitedRequester::new(&api, &config);

        let err = requester.fetch("endpoint").await.unwrap_err();
        assert!(matches!(err, Error::RetriesExhausted { attempts: 10, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_attempts_are_retried() {
        let mut api = MockSourceApi::new();
        let mut seq = Sequence::new();
        api.expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(io_error()));
        api.expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(None, "no header")));
        api.expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(Some("many"), "bad header")));
        api.expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(SourceResponse {
                    status: StatusCode::OK,
                    rate_limit_remaining: Some("10".to_string()),
                    body: Err(io_error()),
                })
            });
        api.expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(Some("10"), "")));
        api.expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(SourceResponse {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    rate_limit_remaining: Some("10".to_string()),
                    body: Ok("oops".to_string()),
                })
            });
        api.expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(response(Some("9"), "finally")));

        let config = ExportConfig::default();
        let requester = RateLimitedRequester::new(&api, &config);
        let fetched = requester.fetch("endpoint").await.unwrap();

        assert_eq!(fetched.body, "finally");
        assert_eq!(fetched.remaining, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_is_returned() {
        let mut api = MockSourceApi::new();
        api.expect_get()
            .times(1)
            .returning(|_| Err(Error::Config("bad token".to_string())));

        let config = ExportConfig::default();
        let requester = RateLimitedRequester::new(&api, &config);

        assert!(matches!(
            requester.fetch("endpoint").await,
            Err(Error::Config(_))
        ));
    }
}
