//! Shared test case model and report protocol vocabulary for nanotest.
//!
//! This crate is intentionally small and dependency-free. It holds the values every other part of the workspace
//! agrees on:
//! - the test case model: groups, cases, selections and results (built once, then read-only);
//! - the marker capability model that discovery output is expressed in;
//! - the report protocol vocabulary: record scopes and the report code registry.
//!
//! ## Notes
//!
//! - No IO and no global state. Parsing agent output lives in the `nanotest` crate.

pub mod builder;
pub mod markers;
pub mod model;
pub mod protocol;
pub mod result;

pub use builder::{BuiltGroup, ClassDeclaration, DeclaredMember, DiscoveryWarning, GroupBuilder};
pub use markers::{MarkerKind, TestMarker};
pub use model::{
    DeviceType, InstantiationType, LifecycleMethod, NO_INDEX, NOT_SELECTED, SelectedCase, SourceLocation, TestCase,
    TestCaseGroup, TestCaseId, TestCaseSelection,
};
pub use protocol::{CodeEncoding, ProtocolRecord, RecordScope, ReportCode};
pub use result::{TestOutcome, TestResult, format_ticks};
