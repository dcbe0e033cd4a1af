//! Bounded-retry orchestration with dual backoff and identity rotation.
//!
//! Every attempt presents a fresh identity. Failure kinds drive two
//! different delay schedules:
//! - [`ExtractError::Blocked`] is adversarial: spacing attempts out and
//!   changing identity both help, so the delay grows exponentially
//!   (`backoff_base ^ attempt` seconds).
//! - [`ExtractError::Unavailable`] / [`ExtractError::Unknown`] are usually
//!   resolved by a short wait, so the delay is a fixed linear second.
//!
//! Permanent failures (invalid URL, video gone, artifact missing) are never
//! retried and return without sleeping.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::extract::{ExtractError, ExtractionConfig, Extractor, RawMediaInfo};
use crate::identity::{IdentityRotator, RequestIdentity};

/// Default maximum attempts per request (including the first).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default exponent base for blocked-upstream backoff.
pub const DEFAULT_BLOCKED_BACKOFF_BASE: f64 = 1.5;

/// Fixed delay between retries of transient failures.
const TRANSIENT_DELAY: Duration = Duration::from_secs(1);

/// Decision on whether to retry a failed extraction attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Retry after the given delay.
    Retry {
        /// How long to sleep before the next attempt.
        delay: Duration,
        /// The attempt number about to run (1-indexed).
        next_attempt: u32,
    },
    /// Stop and surface the current error.
    GiveUp {
        /// Human-readable reason retrying stopped.
        reason: String,
    },
}

/// Retry configuration: attempt cap plus the two backoff schedules.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    blocked_backoff_base: f64,
    transient_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            blocked_backoff_base: DEFAULT_BLOCKED_BACKOFF_BASE,
            transient_delay: TRANSIENT_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with a custom attempt cap, keeping default backoff.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns the configured attempt cap.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retrying a blocked attempt: `base ^ attempt` seconds.
    #[must_use]
    pub fn blocked_delay(&self, attempt: u32) -> Duration {
        Duration::from_secs_f64(self.blocked_backoff_base.powi(attempt.min(i32::MAX as u32) as i32))
    }

    /// Decides whether the attempt that just failed should be retried.
    ///
    /// `attempt` is the 1-indexed number of the attempt that failed.
    #[instrument(skip(self, error), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, error: &ExtractError, attempt: u32) -> RetryDecision {
        if error.is_permanent() {
            return RetryDecision::GiveUp {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, "attempt cap reached");
            return RetryDecision::GiveUp {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = match error {
            ExtractError::Blocked { .. } => self.blocked_delay(attempt),
            _ => self.transient_delay,
        };

        debug!(attempt, delay_ms = delay.as_millis(), "will retry");
        RetryDecision::Retry {
            delay,
            next_attempt: attempt + 1,
        }
    }
}

/// One attempt's record, kept by the runner for the lifetime of a single
/// request and discarded with it.
#[derive(Debug)]
struct ExtractionAttempt {
    number: u32,
    user_agent: String,
    failure: String,
}

/// Drives an [`Extractor`] under a [`RetryPolicy`], rotating identity
/// between attempts.
///
/// Each in-flight request runs its own state machine over shared read-only
/// parts, so a runner can serve any number of concurrent requests.
pub struct ExtractionRunner {
    extractor: Arc<dyn Extractor>,
    rotator: IdentityRotator,
    policy: RetryPolicy,
}

impl ExtractionRunner {
    /// Creates a runner around an extractor with the given policy.
    #[must_use]
    pub fn new(extractor: Arc<dyn Extractor>, policy: RetryPolicy) -> Self {
        Self {
            extractor,
            rotator: IdentityRotator::new(),
            policy,
        }
    }

    /// Runs the bounded attempt loop for one request.
    ///
    /// A fresh identity is drawn before every attempt, the first included.
    /// Returns the first success, or the last error once the policy gives
    /// up. Permanent failures return immediately without sleeping.
    ///
    /// # Errors
    ///
    /// The last [`ExtractError`] observed when attempts are exhausted, or
    /// the permanent error that short-circuited the loop. A blocked
    /// exhaustion keeps [`ExtractError::Blocked`] so the HTTP layer can
    /// answer 429.
    #[instrument(skip(self, config), fields(extractor = self.extractor.name()))]
    pub async fn fetch(
        &self,
        url: &str,
        config: &ExtractionConfig,
    ) -> Result<RawMediaInfo, ExtractError> {
        let mut attempts: Vec<ExtractionAttempt> = Vec::new();

        for attempt in 1..=self.policy.max_attempts() {
            let identity: RequestIdentity = self.rotator.next();
            debug!(attempt, user_agent = %identity.user_agent, "starting extraction attempt");

            let error = match self.extractor.extract(url, config, &identity).await {
                Ok(raw) => {
                    debug!(attempt, "extraction succeeded");
                    return Ok(raw);
                }
                Err(error) => error,
            };

            attempts.push(ExtractionAttempt {
                number: attempt,
                user_agent: identity.user_agent,
                failure: error.to_string(),
            });

            match self.policy.should_retry(&error, attempt) {
                RetryDecision::Retry {
                    delay,
                    next_attempt,
                } => {
                    warn!(
                        attempt,
                        next_attempt,
                        delay_ms = delay.as_millis(),
                        error = %error,
                        "attempt failed; retrying with a fresh identity"
                    );
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp { reason } => {
                    warn!(
                        attempt,
                        reason = %reason,
                        trail = ?attempts
                            .iter()
                            .map(|a| (a.number, a.user_agent.as_str(), a.failure.as_str()))
                            .collect::<Vec<_>>(),
                        "giving up"
                    );
                    return Err(error);
                }
            }
        }

        // The loop always returns from within its final iteration; the cap
        // is >= 1, so at least one attempt runs.
        Err(ExtractError::unknown("no extraction attempt was made"))
    }

    /// The policy this runner applies.
    #[must_use]
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}
