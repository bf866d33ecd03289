#![forbid(unsafe_code)]
//! nanotest: execution report parsing for on-device test runs
//!
//! A test agent running on a device (or its emulator) prints test output interleaved with control records. This
//! crate turns that stream back into exactly one result per selected test case, with setup, cleanup and deployment
//! output attached to the right case.
//!
//! - [`report`]: the streaming parser (`OutputParser`) and its configuration.
//! - [`manifest`]: JSON discovery manifests and the selection built from them.
//! - [`cli`]: the `nanotest` command line tool.
//!
//! The test case model and protocol vocabulary live in `nanotest_core` and are re-exported here.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`. The parser never fails on agent output; it degrades instead.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.

pub mod cli;
pub mod manifest;
pub mod report;

pub use nanotest_core::{
    CodeEncoding, DeviceType, ProtocolRecord, RecordScope, ReportCode, TestCase, TestCaseGroup, TestCaseSelection,
    TestOutcome, TestResult,
};

pub use manifest::{Manifest, ManifestError};
pub use report::{CollectingSink, ConfigError, OutputParser, ParserConfig, ResultSink};
