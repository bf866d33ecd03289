//! Streaming output parser.
//!
//! Accepts arbitrarily chunked agent output, splits it into lines, and drives the decoder and the scope tracker.
//! Results are handed to a [`ResultSink`] in batches, as soon as the scope that owns them is resolved.
//!
//! ## Notes
//!
//! - Partial lines are kept as raw bytes, so a chunk boundary may split a multi-byte UTF-8 sequence.
//! - Every selected case is reported exactly once over the parser's lifetime.

use std::mem;

use nanotest_core::{TestCaseSelection, TestResult};

use super::config::{ConfigError, ParserConfig};
use super::decoder::{Line, RecordDecoder};
use super::outcome::{self, Finished, Section, Verdict};
use super::scope::{ScopeTracker, TextRoute};

/// Receives batches of results.
pub trait ResultSink {
    fn on_results(&mut self, results: Vec<TestResult>);
}

impl<F> ResultSink for F
where
    F: FnMut(Vec<TestResult>),
{
    fn on_results(&mut self, results: Vec<TestResult>) {
        self(results)
    }
}

/// Sink that keeps every result it receives, in emission order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub results: Vec<TestResult>,
    /// Number of batches received.
    pub batches: usize,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultSink for CollectingSink {
    fn on_results(&mut self, results: Vec<TestResult>) {
        self.batches += 1;
        self.results.extend(results);
    }
}

/// Turns the output of one test run into one result per selected case.
#[derive(Debug)]
pub struct OutputParser<S: ResultSink> {
    selection: TestCaseSelection,
    decoder: RecordDecoder,
    tracker: ScopeTracker,
    /// Text seen before the first class scope, plus text after the last one once the run is flushed.
    deployment: String,
    /// Bytes after the last line terminator.
    pending: Vec<u8>,
    /// Indexed by selection position.
    reported: Vec<bool>,
    sink: S,
}

impl<S: ResultSink> OutputParser<S> {
    /// Bind a parser to a selection. The selection is read-only from here on.
    pub fn new(selection: TestCaseSelection, config: &ParserConfig, sink: S) -> Result<Self, ConfigError> {
        config.validate()?;
        if selection.device_type != config.device_type {
            return Err(ConfigError::DeviceMismatch {
                configured: config.device_type,
                selection: selection.device_type,
            });
        }
        tracing::debug!(
            assembly = %selection.assembly_file_path,
            selected = selection.selected_count(),
            prefix = %config.report_prefix,
            "output parser created"
        );
        Ok(Self {
            reported: vec![false; selection.len()],
            selection,
            decoder: RecordDecoder::new(config.report_prefix.clone(), config.code_encoding),
            tracker: ScopeTracker::new(),
            deployment: String::new(),
            pending: Vec::new(),
            sink,
        })
    }

    pub fn selection(&self) -> &TestCaseSelection {
        &self.selection
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Number of selected cases a result has been emitted for.
    pub fn reported_count(&self) -> usize {
        self.reported.iter().filter(|&&done| done).count()
    }

    pub fn add_output(&mut self, text: &str) {
        self.add_output_bytes(text.as_bytes());
    }

    /// Append raw output. Complete lines are processed immediately; the rest waits for more input or `flush`.
    pub fn add_output_bytes(&mut self, bytes: &[u8]) {
        let Some(last_newline) = bytes.iter().rposition(|&b| b == b'\n') else {
            self.pending.extend_from_slice(bytes);
            return;
        };
        self.pending.extend_from_slice(&bytes[..last_newline]);
        let complete = mem::replace(&mut self.pending, bytes[last_newline + 1..].to_vec());
        for line in complete.split(|&b| b == b'\n') {
            self.process_line(line);
        }
    }

    /// Finish the run: process the last unterminated line, close open scopes, and report every case that has no
    /// result yet as not run. Calling it again emits nothing.
    #[tracing::instrument(skip_all, fields(assembly = %self.selection.assembly_file_path))]
    pub fn flush(&mut self) {
        if !self.pending.is_empty() {
            let line = mem::take(&mut self.pending);
            self.process_line(&line);
        }

        let finished = self.tracker.close_all(&self.selection);
        self.emit(finished);

        // Output after the last class explains why the remaining cases never ran.
        let trailing = self.tracker.take_carried();
        if !trailing.is_empty() {
            self.deployment.push_str(&trailing);
        }

        let not_run: Vec<Finished> = self
            .selection
            .entries()
            .iter()
            .enumerate()
            .filter(|&(position, entry)| entry.is_selected() && !self.reported[position])
            .map(|(position, _)| Finished {
                position,
                verdict: Verdict::not_run(),
                output: String::new(),
                setup: Section::default(),
                cleanup: Section::default(),
            })
            .collect();
        self.emit(not_run);

        tracing::debug!(reported = self.reported_count(), "flushed");
    }

    fn process_line(&mut self, raw: &[u8]) {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw);
        match self.decoder.classify(&line) {
            Line::Record(record) => {
                let finished = self.tracker.apply(&record, &self.selection);
                self.emit(finished);
            }
            Line::Text(text) => {
                let route = self.tracker.route_text(text);
                tracing::trace!(?route, text, "text");
                if route == TextRoute::Deployment {
                    self.deployment.push_str(text);
                    self.deployment.push('\n');
                }
            }
        }
    }

    fn emit(&mut self, finished: Vec<Finished>) {
        let mut results = Vec::with_capacity(finished.len());
        for done in finished {
            let Some(entry) = self.selection.entries().get(done.position) else {
                continue;
            };
            if !entry.is_selected() || self.reported[done.position] {
                tracing::debug!(case = %entry.case.test_case_id(), "case already reported; result dropped");
                continue;
            }
            self.reported[done.position] = true;
            results.push(outcome::build_result(
                &entry.case,
                entry.selection_index,
                &done,
                &self.deployment,
            ));
        }
        if !results.is_empty() {
            tracing::debug!(count = results.len(), "emitting results");
            self.sink.on_results(results);
        }
    }
}
