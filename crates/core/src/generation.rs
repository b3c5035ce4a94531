//! Generation policy: attempt bounds, backoff, timeouts, and version
//! attribution constants.
//!
//! The orchestration loop itself lives in the API crate's engine; the
//! numbers and small pure helpers it follows live here.

use std::time::Duration;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Version attribution
// ---------------------------------------------------------------------------

/// A version created by a direct user edit.
pub const CREATED_BY_USER: &str = "user";
/// A version created by an accepted generation.
pub const CREATED_BY_GENERATION: &str = "generation";

/// All valid version attribution values.
pub const VALID_CREATED_BY: &[&str] = &[CREATED_BY_USER, CREATED_BY_GENERATION];

/// Validate that a version attribution is one of the known constants.
pub fn validate_created_by(value: &str) -> Result<(), CoreError> {
    if VALID_CREATED_BY.contains(&value) {
        Ok(())
    } else {
        Err(CoreError::validation(
            "created_by",
            format!(
                "invalid attribution '{value}'. Must be one of: {}",
                VALID_CREATED_BY.join(", ")
            ),
        ))
    }
}

// ---------------------------------------------------------------------------
// Retry / timeout policy
// ---------------------------------------------------------------------------

/// Maximum provider attempts per generation (first try + retries).
pub const MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubles on each subsequent retry.
pub const BACKOFF_BASE: Duration = Duration::from_millis(500);

/// Hard ceiling on a single backoff delay.
pub const BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Upper bound on a single provider call.
pub const PROVIDER_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(120);

/// A generation stuck in `running` longer than this is forcibly failed
/// by the background sweep.
pub const RUNNING_TIMEOUT: Duration = Duration::from_secs(600);

/// How often the stuck-generation sweep runs.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Bounded retries of the success write-back when it loses a revision
/// race against a concurrent snippet writer.
pub const WRITEBACK_RETRIES: u32 = 3;

/// Backoff delay before retry number `attempt` (1-based: the delay
/// taken after the `attempt`-th failed call).
///
/// Exponential: `BACKOFF_BASE * 2^(attempt-1)`, capped at
/// [`BACKOFF_CAP`].
pub fn backoff_delay(attempt: u32) -> Duration {
    let exp = attempt.saturating_sub(1).min(16);
    let delay = BACKOFF_BASE.saturating_mul(1 << exp);
    delay.min(BACKOFF_CAP)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
