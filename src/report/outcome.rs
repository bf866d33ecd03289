//! Outcome synthesis: turn terminal records into outcomes and compose result messages.
//!
//! Everything here is pure. The scope tracker decides *which* rule applies (it knows the sub-phase and the scope
//! level); this module owns the exact wording, the error messages and the layout of the final `messages` text.

use std::sync::Arc;

use nanotest_core::{TestCase, TestOutcome, TestResult, format_ticks};

use super::scope::SubPhase;

pub const TEST_FAILED: &str = "Test failed";
pub const TEST_SKIPPED: &str = "Test skipped";
pub const SETUP_FAILED: &str = "Setup failed";
pub const CLEANUP_FAILED: &str = "Cleanup failed";
pub const METHOD_NOT_FOUND: &str = "Method not found";
pub const NOT_RUN: &str = "Test has not been run";
pub const NOT_COMPLETED: &str = "Test did not complete";

const SETUP_HEADER: &str = "*** Setup ***";
const CLEANUP_HEADER: &str = "*** Cleanup ***";
const DEPLOYMENT_HEADER: &str = "*** Deployment ***";

/// Outcome, error message and primary message line of one test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub outcome: TestOutcome,
    pub error_message: String,
    pub body: String,
    pub duration: u64,
}

impl Verdict {
    fn new(outcome: TestOutcome, error_message: &str, body: String, duration: u64) -> Self {
        Self {
            outcome,
            error_message: error_message.to_string(),
            body,
            duration,
        }
    }

    pub fn passed(elapsed: u64) -> Self {
        Self::new(
            TestOutcome::Passed,
            "",
            format!("Test passed after {} ms", format_ticks(elapsed)),
            elapsed,
        )
    }

    pub fn failed(elapsed: u64, reason: &str) -> Self {
        Self::new(
            TestOutcome::Failed,
            TEST_FAILED,
            format!("Test failed after {} ms: {reason}", format_ticks(elapsed)),
            elapsed,
        )
    }

    pub fn skipped(elapsed: u64, reason: &str) -> Self {
        Self::new(
            TestOutcome::Skipped,
            TEST_SKIPPED,
            format!("Execution of the test is aborted after {} ms: {reason}", format_ticks(elapsed)),
            elapsed,
        )
    }

    /// The test method itself could not be invoked; the agent's reason is reported verbatim.
    pub fn method_not_found(elapsed: u64, reason: &str) -> Self {
        Self::new(TestOutcome::Failed, METHOD_NOT_FOUND, reason.to_string(), elapsed)
    }

    /// Setup failed before the test body ran. The failure text itself lives in the Setup section.
    pub fn setup_failed(elapsed: u64) -> Self {
        Self::new(TestOutcome::Failed, SETUP_FAILED, format!("{NOT_RUN}."), elapsed)
    }

    pub fn not_run() -> Self {
        Self::new(TestOutcome::None, NOT_RUN, format!("{NOT_RUN}."), 0)
    }

    /// Started, but no terminal record arrived before the scope was closed.
    pub fn incomplete(elapsed: u64) -> Self {
        Self::new(
            TestOutcome::Failed,
            NOT_COMPLETED,
            format!("{NOT_COMPLETED} after {} ms: no result was reported", format_ticks(elapsed)),
            elapsed,
        )
    }

    /// Apply a cleanup failure that happened after this verdict was reached.
    ///
    /// A verdict that is already `Failed` keeps its own outcome and error message.
    pub fn downgrade_for_cleanup(mut self) -> Self {
        if self.outcome != TestOutcome::Failed {
            self.outcome = TestOutcome::Failed;
            self.error_message = CLEANUP_FAILED.to_string();
        }
        self
    }
}

/// Settle the verdict of a case whose scope has closed.
///
/// `own` is the verdict from the case's own terminal record, if one arrived. Without it the case failed setup, or
/// started and never finished, or never started at all.
pub fn settle(own: Option<Verdict>, started: bool, last_elapsed: u64, setup_failed: bool, cleanup_failed: bool) -> Verdict {
    let verdict = match own {
        Some(verdict) => verdict,
        None if setup_failed => Verdict::setup_failed(if started { last_elapsed } else { 0 }),
        None if started => Verdict::incomplete(last_elapsed),
        None => Verdict::not_run(),
    };
    if cleanup_failed { verdict.downgrade_for_cleanup() } else { verdict }
}

/// Line describing a failed opening half (constructor or setup), by the last sub-phase seen.
pub fn setup_failure_line(phase: SubPhase, elapsed: u64, reason: &str) -> String {
    let what = match phase {
        SubPhase::Instantiated => "Constructor of test class",
        SubPhase::SetupRunning => "Execution of setup method",
        _ => "Setup for the test",
    };
    format!("{what} failed after {} ms: {reason}", format_ticks(elapsed))
}

/// Line describing a failed closing half (cleanup or dispose), by the last sub-phase seen.
pub fn cleanup_failure_line(phase: SubPhase, elapsed: u64, reason: &str) -> String {
    let what = match phase {
        SubPhase::CleanupRunning => "Execution of cleanup method",
        SubPhase::Disposed => "IDisposable.Dispose of test class",
        _ => "Cleanup for the test",
    };
    format!("{what} failed after {} ms: {reason}", format_ticks(elapsed))
}

/// Captured text of one lifecycle section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub text: String,
    /// A lifecycle failure was recorded in this section.
    pub failed: bool,
}

impl Section {
    pub fn push_line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }

    pub fn record_failure(&mut self, line: &str) {
        self.push_line(line);
        self.failed = true;
    }
}

/// Everything needed to build one result, gathered by the scope tracker.
#[derive(Debug, Clone)]
pub struct Finished {
    /// Position of the case in the bound selection.
    pub position: usize,
    pub verdict: Verdict,
    /// Text the test body printed.
    pub output: String,
    pub setup: Section,
    pub cleanup: Section,
}

/// Compose the `messages` text of a result.
///
/// Sections are separated by one blank line: the primary body (plus test output), then Setup and Cleanup when the
/// group declares the method or a failure was recorded there, then always Deployment.
pub fn compose_messages(case: &TestCase, finished: &Finished, deployment: &str) -> String {
    let mut body = finished.verdict.body.clone();
    let output = finished.output.trim();
    if !output.is_empty() {
        body.push('\n');
        body.push_str(output);
    }

    let mut parts = vec![body];
    if case.group.has_setup() || finished.setup.failed {
        parts.push(section(SETUP_HEADER, &finished.setup.text));
    }
    if case.group.has_cleanup() || finished.cleanup.failed {
        parts.push(section(CLEANUP_HEADER, &finished.cleanup.text));
    }
    parts.push(section(DEPLOYMENT_HEADER, deployment));
    parts.join("\n\n")
}

/// Build the result for a finished case.
pub fn build_result(case: &Arc<TestCase>, selection_index: i32, finished: &Finished, deployment: &str) -> TestResult {
    TestResult {
        test: Arc::clone(case),
        selection_index,
        display_name: case.display_name.clone(),
        duration: finished.verdict.duration,
        outcome: finished.verdict.outcome,
        error_message: finished.verdict.error_message.clone(),
        messages: compose_messages(case, finished, deployment),
    }
}

fn section(header: &str, text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        header.to_string()
    } else {
        format!("{header}\n{text}")
    }
}
