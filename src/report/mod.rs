//! Execution report parsing.
//!
//! The test agent prints free-form text interleaved with control records of the form
//! `prefix:{C|M|D}:Identifier:ElapsedTicks:Code[:Reason]`. This module turns that stream back into one
//! [`TestResult`](nanotest_core::TestResult) per selected test case.
//!
//! - [`decoder`]: classifies a line as record or plain text.
//! - [`scope`]: tracks open class/method scopes and routes text to their buffers.
//! - [`outcome`]: outcome rules and message layout.
//! - [`parser`]: the streaming front end and result emission.
//!
//! ## Notes
//!
//! - Nothing here fails on bad input: malformed records are text, unknown identifiers are ignored, and cases the
//!   agent never reported come out as not run.

pub mod config;
pub mod decoder;
pub mod outcome;
pub mod parser;
pub mod scope;

pub use config::{ConfigError, DEFAULT_REPORT_PREFIX, ParserConfig};
pub use decoder::{Line, RecordDecoder};
pub use parser::{CollectingSink, OutputParser, ResultSink};
