//! Retrying HTTP transport.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use tracing::{info, warn};

use super::config::{ClientConfig, RetryPolicy};
use super::request::SignedRequest;
use crate::clock::{Clock, Sleeper, SystemClock, TokioSleeper};
use crate::error::TransportFailure;
use crate::{Error, Result};

/// A successful SP-API response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Raw body text
    pub body: String,
    /// Attempts it took, including the successful one
    pub attempts: u32,
}

impl ApiResponse {
    /// Whether the body is empty or whitespace.
    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }
}

/// Where a call stands between attempts.
#[derive(Debug)]
enum AttemptState {
    Sent { attempt: u32 },
    Retrying { attempt: u32, delay: Duration },
    Success(ApiResponse),
    Failed(Error),
}

/// How a single attempt ended.
enum AttemptOutcome {
    Success(ApiResponse),
    Retryable {
        status: Option<u16>,
        reason: String,
        retry_after: Option<Duration>,
    },
    Fatal(Error),
}

/// Sends signed requests, retrying transient failures per a [`RetryPolicy`].
///
/// Dropping the future returned by [`execute_signed`](Self::execute_signed)
/// cancels the in-flight attempt and any pending backoff; no further
/// attempts are made.
#[derive(Clone)]
pub struct Transport {
    http: reqwest::Client,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
}

impl Transport {
    /// Create a transport using the Tokio timer and system clock.
    pub fn new(http: reqwest::Client, policy: RetryPolicy) -> Self {
        Self {
            http,
            policy,
            sleeper: Arc::new(TokioSleeper),
            clock: Arc::new(SystemClock),
        }
    }

    /// Build the underlying HTTP client from `config`.
    pub fn http_client(config: &ClientConfig) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?)
    }

    /// Replace the sleeper used between attempts.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replace the clock used to interpret `Retry-After` dates.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The retry policy in force.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send `request` until it succeeds, fails permanently, or runs out of
    /// attempts.
    ///
    /// Every attempt resends the same signed bytes. Use
    /// [`execute_signed`](Self::execute_signed) when attempts may be spread
    /// across a credential refresh.
    ///
    /// # Errors
    ///
    /// See [`execute_signed`](Self::execute_signed).
    pub async fn execute(&self, request: &SignedRequest) -> Result<ApiResponse> {
        self.execute_signed(move || {
            let request = request.clone();
            async move { Ok(request) }
        })
        .await
    }

    /// Run the attempt loop, calling `sign` for a freshly signed request
    /// before each attempt.
    ///
    /// Non-idempotent requests get exactly one attempt.
    ///
    /// # Errors
    ///
    /// - whatever `sign` returns, before the attempt it was signing
    /// - [`Error::Client`] for a 4xx other than a retryable status
    /// - [`TransportFailure::RetriesExhausted`] when every attempt hit a
    ///   retryable condition
    /// - [`TransportFailure::NonRetryable`] for any other failure
    pub async fn execute_signed<F, Fut>(&self, mut sign: F) -> Result<ApiResponse>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<SignedRequest>>,
    {
        let mut state = AttemptState::Sent { attempt: 1 };
        loop {
            state = match state {
                AttemptState::Sent { attempt } => match sign().await {
                    Ok(request) => {
                        let max_attempts = if request.idempotent {
                            self.policy.max_attempts()
                        } else {
                            1
                        };
                        let started = Instant::now();
                        let outcome = self.attempt(&request, attempt).await;
                        let latency_ms = started.elapsed().as_millis() as u64;
                        self.next_state(&request, attempt, max_attempts, outcome, latency_ms)
                    }
                    Err(error) => {
                        warn!(attempt, error = %error, "Could not sign SP-API attempt");
                        AttemptState::Failed(error)
                    }
                },
                AttemptState::Retrying { attempt, delay } => {
                    self.sleeper.sleep(delay).await;
                    AttemptState::Sent {
                        attempt: attempt + 1,
                    }
                }
                AttemptState::Success(response) => return Ok(response),
                AttemptState::Failed(error) => return Err(error),
            };
        }
    }

    fn next_state(
        &self,
        request: &SignedRequest,
        attempt: u32,
        max_attempts: u32,
        outcome: AttemptOutcome,
        latency_ms: u64,
    ) -> AttemptState {
        let method = request.method.as_str();
        let path = request.url.path();

        match outcome {
            AttemptOutcome::Success(response) => {
                info!(
                    method,
                    path,
                    attempt,
                    status = response.status,
                    latency_ms,
                    outcome = "success",
                    "SP-API attempt"
                );
                AttemptState::Success(response)
            }
            AttemptOutcome::Fatal(error) => {
                info!(
                    method,
                    path,
                    attempt,
                    status = error.status(),
                    latency_ms,
                    outcome = "failed",
                    error = %error,
                    "SP-API attempt"
                );
                AttemptState::Failed(error)
            }
            AttemptOutcome::Retryable {
                status,
                reason,
                retry_after,
            } => {
                if attempt < max_attempts {
                    let delay = match retry_after {
                        Some(wait) => wait.min(self.policy.max_delay),
                        None => self.jittered_backoff(attempt),
                    };
                    info!(
                        method,
                        path,
                        attempt,
                        status,
                        latency_ms,
                        outcome = "retry",
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "SP-API attempt"
                    );
                    AttemptState::Retrying { attempt, delay }
                } else if !request.idempotent {
                    warn!(method, path, status, latency_ms, reason = %reason, "Not retrying non-idempotent request");
                    AttemptState::Failed(
                        TransportFailure::NonRetryable { status, reason }.into(),
                    )
                } else {
                    warn!(
                        method,
                        path,
                        attempt,
                        status,
                        latency_ms,
                        outcome = "exhausted",
                        reason = %reason,
                        "SP-API attempt"
                    );
                    AttemptState::Failed(
                        TransportFailure::RetriesExhausted {
                            attempts: attempt,
                            status,
                            last_error: reason,
                        }
                        .into(),
                    )
                }
            }
        }
    }

    async fn attempt(&self, request: &SignedRequest, attempt: u32) -> AttemptOutcome {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return classify_reqwest_error(e),
        };

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return classify_reqwest_error(e),
        };

        if (200..300).contains(&status) {
            return AttemptOutcome::Success(ApiResponse {
                status,
                headers,
                body,
                attempts: attempt,
            });
        }

        if self.policy.should_retry_status(status) {
            let retry_after = headers
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| parse_retry_after(v, self.clock.now()));
            return AttemptOutcome::Retryable {
                status: Some(status),
                reason: format!("HTTP {}", status),
                retry_after,
            };
        }

        if (400..500).contains(&status) {
            return AttemptOutcome::Fatal(Error::from_api_response(status, body));
        }

        AttemptOutcome::Fatal(
            TransportFailure::NonRetryable {
                status: Some(status),
                reason: format!("HTTP {}", status),
            }
            .into(),
        )
    }

    fn jittered_backoff(&self, attempt: u32) -> Duration {
        let backoff = self.policy.backoff_for_attempt(attempt);
        if self.policy.jitter.is_zero() {
            return backoff;
        }
        let jitter = self.policy.jitter.as_secs_f64();
        let offset = rand::thread_rng().gen_range(-jitter..=jitter);
        let secs = (backoff.as_secs_f64() + offset).max(0.0);
        Duration::from_secs_f64(secs).min(self.policy.max_delay)
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("policy", &self.policy)
            .finish()
    }
}

fn classify_reqwest_error(error: reqwest::Error) -> AttemptOutcome {
    if error.is_timeout() || error.is_connect() || error.is_request() || error.is_body() {
        AttemptOutcome::Retryable {
            status: None,
            reason: error.to_string(),
            retry_after: None,
        }
    } else {
        AttemptOutcome::Fatal(
            TransportFailure::NonRetryable {
                status: error.status().map(|s| s.as_u16()),
                reason: error.to_string(),
            }
            .into(),
        )
    }
}

/// Parse a `Retry-After` value: delta-seconds or an HTTP-date.
///
/// Dates in the past yield zero.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<f64>() {
        if !secs.is_finite() || secs < 0.0 {
            return None;
        }
        return Some(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX));
    }
    let at = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}
