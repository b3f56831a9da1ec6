//! Reconnection backoff

use std::time::Duration;

use crate::types::options::BackoffPolicy;

/// Delay before retry number `attempt` (1-based)
///
/// Starts at `initial`, doubles per attempt and never exceeds `max`.
#[must_use]
pub fn delay_for(policy: BackoffPolicy, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
    policy.initial.saturating_mul(factor).min(policy.max)
}
