//! Test results and tick formatting.

use std::fmt;
use std::sync::Arc;

use crate::model::TestCase;

/// Number of 100ns ticks in one millisecond.
pub const TICKS_PER_MILLISECOND: u64 = 10_000;

/// Final state of one test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TestOutcome {
    /// The test never ran.
    #[default]
    None,
    Passed,
    Failed,
    Skipped,
}

impl TestOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            TestOutcome::None => "None",
            TestOutcome::Passed => "Passed",
            TestOutcome::Failed => "Failed",
            TestOutcome::Skipped => "Skipped",
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result reported for one selected test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestResult {
    pub test: Arc<TestCase>,
    pub selection_index: i32,
    pub display_name: String,
    /// Elapsed time reported by the agent, in 100ns ticks.
    pub duration: u64,
    pub outcome: TestOutcome,
    pub error_message: String,
    pub messages: String,
}

impl TestResult {
    pub fn is_failure(&self) -> bool {
        self.outcome == TestOutcome::Failed
    }

    pub fn duration_millis(&self) -> u64 {
        self.duration / TICKS_PER_MILLISECOND
    }
}

/// Render a tick count as whole milliseconds for result messages.
///
/// Zero renders as `"< 1"`; anything else is truncated, so `25_000` ticks is `"2"` and `5_000` ticks is `"0"`.
pub fn format_ticks(ticks: u64) -> String {
    if ticks == 0 {
        "< 1".to_string()
    } else {
        (ticks / TICKS_PER_MILLISECOND).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ticks_zero() {
        assert_eq!(format_ticks(0), "< 1");
    }

    #[test]
    fn test_format_ticks_truncates() {
        assert_eq!(format_ticks(10_000), "1");
        assert_eq!(format_ticks(25_000), "2");
        assert_eq!(format_ticks(19_999), "1");
        assert_eq!(format_ticks(5_000), "0");
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(TestOutcome::default(), TestOutcome::None);
        assert_eq!(TestOutcome::Skipped.to_string(), "Skipped");
    }
}
