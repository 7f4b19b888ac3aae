//! Synthetic progress derived from the attempt counter.

use schemars::JsonSchema;
use serde::Serialize;
use shopreel_models::JobState;

/// Highest percentage reported before success is observed.
pub const MAX_PENDING_PERCENT: u8 = 95;

/// Progress snapshot published after each status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub struct PollProgress {
    pub attempt: u32,
    pub max_attempts: u32,
    pub percent: u8,
    pub state: JobState,
}

impl PollProgress {
    /// Nothing checked yet.
    pub fn initial(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            percent: 0,
            state: JobState::Pending,
        }
    }

    /// After a non-terminal check.
    pub fn observed(attempt: u32, max_attempts: u32, state: JobState) -> Self {
        Self {
            attempt,
            max_attempts,
            percent: pending_percent(attempt, max_attempts),
            state,
        }
    }

    /// After observing success.
    pub fn complete(attempt: u32, max_attempts: u32) -> Self {
        Self {
            attempt,
            max_attempts,
            percent: 100,
            state: JobState::Succeeded,
        }
    }
}

/// `min(95, round(attempt * 100 / max_attempts))`.
pub fn pending_percent(attempt: u32, max_attempts: u32) -> u8 {
    let max = u64::from(max_attempts.max(1));
    let rounded = (u64::from(attempt) * 100 + max / 2) / max;
    rounded.min(u64::from(MAX_PENDING_PERCENT)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_rounding() {
        assert_eq!(pending_percent(0, 200), 0);
        assert_eq!(pending_percent(1, 200), 1); // 0.5 rounds up
        assert_eq!(pending_percent(1, 3), 33);
        assert_eq!(pending_percent(2, 3), 67);
    }

    #[test]
    fn test_percent_capped_below_complete() {
        assert_eq!(pending_percent(5, 5), 95);
        assert_eq!(pending_percent(199, 200), 95);
        assert_eq!(pending_percent(u32::MAX, 1), 95);
    }

    #[test]
    fn test_percent_monotonic() {
        let max = 150;
        let mut last = 0;
        for attempt in 0..=max {
            let p = pending_percent(attempt, max);
            assert!(p >= last);
            last = p;
        }
    }
}
