//! Console reporting for replayed runs (pytest-style).

use nanotest_core::{TestOutcome, TestResult, format_ticks};

/// Receives results as the parser emits them.
pub trait TestReporter {
    /// Called once the selection is known, before any output is parsed.
    fn on_collection_complete(&mut self, test_count: usize);

    /// Called for every result, in emission order.
    fn on_result(&mut self, result: &TestResult);

    /// Called after the parser has been flushed.
    fn on_run_complete(&mut self, summary: &RunSummary);
}

/// Counts per outcome over one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub not_run: usize,
    /// Sum of the agent-reported durations, in ticks.
    pub duration: u64,
}

impl RunSummary {
    pub fn record(&mut self, result: &TestResult) {
        self.total += 1;
        self.duration += result.duration;
        match result.outcome {
            TestOutcome::Passed => self.passed += 1,
            TestOutcome::Failed => self.failed += 1,
            TestOutcome::Skipped => self.skipped += 1,
            TestOutcome::None => self.not_run += 1,
        }
    }

    /// A run succeeds when every selected case ran and none failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.not_run == 0
    }

    /// Final summary line, without colors.
    pub fn line(&self) -> String {
        let mut parts = Vec::new();
        if self.passed > 0 {
            parts.push(format!("{} passed", self.passed));
        }
        if self.failed > 0 {
            parts.push(format!("{} failed", self.failed));
        }
        if self.skipped > 0 {
            parts.push(format!("{} skipped", self.skipped));
        }
        if self.not_run > 0 {
            parts.push(format!("{} not run", self.not_run));
        }
        if parts.is_empty() {
            parts.push("no tests ran".to_string());
        }
        format!("====== {} in {} ms ======", parts.join(", "), format_ticks(self.duration))
    }
}

/// Default console reporter.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    pub verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn status(&self, result: &TestResult) -> String {
        let millis = result.duration_millis();
        match result.outcome {
            TestOutcome::Passed if self.verbose => format!("\x1b[32mPASSED\x1b[0m ({millis}ms)"),
            TestOutcome::Passed => "\x1b[32m.\x1b[0m".to_string(),
            TestOutcome::Failed if self.verbose => format!("\x1b[31mFAILED\x1b[0m ({millis}ms)"),
            TestOutcome::Failed => "\x1b[31mF\x1b[0m".to_string(),
            TestOutcome::Skipped if self.verbose => "\x1b[33mSKIPPED\x1b[0m".to_string(),
            TestOutcome::Skipped => "\x1b[33ms\x1b[0m".to_string(),
            TestOutcome::None if self.verbose => "\x1b[33mNOT RUN\x1b[0m".to_string(),
            TestOutcome::None => "\x1b[33m?\x1b[0m".to_string(),
        }
    }
}

impl TestReporter for ConsoleReporter {
    fn on_collection_complete(&mut self, test_count: usize) {
        if test_count == 0 {
            eprintln!("No tests collected");
        } else if self.verbose {
            eprintln!("collected {test_count} tests");
        }
    }

    fn on_result(&mut self, result: &TestResult) {
        let status = self.status(result);

        if self.verbose {
            eprintln!("{} {} ... {}", result.test.test_case_id(), result.display_name, status);
        } else {
            eprint!("{status}");
        }

        if result.is_failure() {
            eprintln!("\n\x1b[31m{} ({})\x1b[0m", result.display_name, result.error_message);
            eprintln!("{}", result.messages);
        }
    }

    fn on_run_complete(&mut self, summary: &RunSummary) {
        if !self.verbose {
            eprintln!();
        }
        eprintln!();
        let color = if summary.is_success() { "\x1b[32m" } else { "\x1b[31m" };
        eprintln!("{color}{}\x1b[0m", summary.line());
    }
}
