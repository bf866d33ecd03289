//! Report protocol vocabulary.
//!
//! Agents interleave control records with their free-form output, one record per line:
//!
//! ```text
//! {prefix}:{C|M|D}:{Identifier}:{ElapsedTicks}:{Code}[:{Reason}]
//! ```
//!
//! This module centralizes the record scopes and the report code registry (canonical spellings, aliases and wire
//! ordinals) so the decoder and anything that writes records agree on one table.
//!
//! ## Notes
//!
//! - A run uses one [`CodeEncoding`] for every record; decoding never falls back to the other one.
//! - Ordinals are part of the wire format. Append new codes at the end of [`REPORT_CODES`].

use std::fmt;

/// Separator between record fields.
pub const FIELD_SEPARATOR: char = ':';

/// Separator between a method name and its data-row index in `DataRow` identifiers.
pub const DATA_ROW_SEPARATOR: char = '#';

/// Bracket a record applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordScope {
    Class,
    Method,
    DataRow,
}

impl RecordScope {
    pub fn as_char(self) -> char {
        match self {
            RecordScope::Class => 'C',
            RecordScope::Method => 'M',
            RecordScope::DataRow => 'D',
        }
    }

    pub fn from_char(c: char) -> Option<RecordScope> {
        match c {
            'C' => Some(RecordScope::Class),
            'M' => Some(RecordScope::Method),
            'D' => Some(RecordScope::DataRow),
            _ => None,
        }
    }
}

/// Stable identifier for report codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportCode {
    Start,
    Instantiate,
    Setup,
    SetupComplete,
    SetupFail,
    Pass,
    Fail,
    Skipped,
    Cleanup,
    CleanupFail,
    Dispose,
    CleanUpComplete,
    Done,
    MethodError,
}

impl ReportCode {
    pub fn as_str(self) -> &'static str {
        info_for(self).canonical
    }

    pub fn ordinal(self) -> u32 {
        info_for(self).ordinal
    }
}

impl fmt::Display for ReportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a run encodes the code field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodeEncoding {
    /// Canonical name (or alias), e.g. `Pass`.
    #[default]
    Name,
    /// Wire ordinal, e.g. `5`.
    Ordinal,
}

impl CodeEncoding {
    /// Decode a code field. Returns `None` for anything not valid in this encoding.
    pub fn decode(self, field: &str) -> Option<ReportCode> {
        match self {
            CodeEncoding::Name => from_str(field),
            CodeEncoding::Ordinal => field.parse::<u32>().ok().and_then(from_ordinal),
        }
    }

    pub fn encode(self, code: ReportCode) -> String {
        match self {
            CodeEncoding::Name => code.as_str().to_string(),
            CodeEncoding::Ordinal => code.ordinal().to_string(),
        }
    }
}

/// Registry entry for a report code.
#[derive(Debug, Clone, Copy)]
pub struct CodeInfo {
    pub id: ReportCode,
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub ordinal: u32,
    pub description: &'static str,
}

/// Registry of report codes, in ordinal order.
pub const REPORT_CODES: &[CodeInfo] = &[
    info(ReportCode::Start, "Start", &[], 0, "Scope started; elapsed ticks reset."),
    info(ReportCode::Instantiate, "Instantiate", &[], 1, "Test class constructor running."),
    info(ReportCode::Setup, "Setup", &[], 2, "Setup method running."),
    info(ReportCode::SetupComplete, "SetupComplete", &[], 3, "Setup finished successfully."),
    info(ReportCode::SetupFail, "SetupFail", &[], 4, "Constructor or setup failed."),
    info(ReportCode::Pass, "Pass", &["Passed"], 5, "Test body passed."),
    info(ReportCode::Fail, "Fail", &["Failed"], 6, "Test body failed."),
    info(ReportCode::Skipped, "Skipped", &["Skip"], 7, "Test body skipped itself."),
    info(ReportCode::Cleanup, "Cleanup", &[], 8, "Cleanup method running."),
    info(ReportCode::CleanupFail, "CleanupFail", &[], 9, "Cleanup or dispose failed."),
    info(ReportCode::Dispose, "Dispose", &[], 10, "Test class instance being disposed."),
    info(
        ReportCode::CleanUpComplete,
        "CleanUpComplete",
        &["CleanupComplete"],
        11,
        "Cleanup finished successfully.",
    ),
    info(ReportCode::Done, "Done", &[], 12, "Class scope finished."),
    info(ReportCode::MethodError, "MethodError", &[], 13, "Method could not be invoked."),
];

/// Resolve a code spelling (canonical or alias) to its id.
pub fn from_str(name: &str) -> Option<ReportCode> {
    if let Some(info) = REPORT_CODES.iter().find(|c| c.canonical == name) {
        return Some(info.id);
    }
    REPORT_CODES
        .iter()
        .find(|c| c.aliases.contains(&name))
        .map(|c| c.id)
}

/// Resolve a wire ordinal to its id.
pub fn from_ordinal(ordinal: u32) -> Option<ReportCode> {
    REPORT_CODES.iter().find(|c| c.ordinal == ordinal).map(|c| c.id)
}

/// Return the registry entry for a code.
pub fn info_for(id: ReportCode) -> &'static CodeInfo {
    match id {
        ReportCode::Start => &REPORT_CODES[0],
        ReportCode::Instantiate => &REPORT_CODES[1],
        ReportCode::Setup => &REPORT_CODES[2],
        ReportCode::SetupComplete => &REPORT_CODES[3],
        ReportCode::SetupFail => &REPORT_CODES[4],
        ReportCode::Pass => &REPORT_CODES[5],
        ReportCode::Fail => &REPORT_CODES[6],
        ReportCode::Skipped => &REPORT_CODES[7],
        ReportCode::Cleanup => &REPORT_CODES[8],
        ReportCode::CleanupFail => &REPORT_CODES[9],
        ReportCode::Dispose => &REPORT_CODES[10],
        ReportCode::CleanUpComplete => &REPORT_CODES[11],
        ReportCode::Done => &REPORT_CODES[12],
        ReportCode::MethodError => &REPORT_CODES[13],
    }
}

/// One decoded control record.
///
/// For [`RecordScope::DataRow`] records `identifier` holds the method part only and `data_row_index` the value
/// after `#`; for other scopes `data_row_index` is `-1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolRecord {
    pub scope: RecordScope,
    pub identifier: String,
    pub data_row_index: i32,
    /// Ticks since this scope's own `Start`.
    pub elapsed: u64,
    pub code: ReportCode,
    pub reason: Option<String>,
}

impl ProtocolRecord {
    pub fn new(scope: RecordScope, identifier: impl Into<String>, elapsed: u64, code: ReportCode) -> Self {
        Self {
            scope,
            identifier: identifier.into(),
            data_row_index: -1,
            elapsed,
            code,
            reason: None,
        }
    }

    pub fn with_data_row(mut self, data_row_index: u32) -> Self {
        self.scope = RecordScope::DataRow;
        self.data_row_index = i32::try_from(data_row_index).unwrap_or(i32::MAX);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Reason text, or `""` when the record carried none.
    pub fn reason_text(&self) -> &str {
        self.reason.as_deref().unwrap_or("")
    }

    /// Write the record as one line (without the trailing newline).
    pub fn encode(&self, prefix: &str, encoding: CodeEncoding) -> String {
        let mut line = format!(
            "{prefix}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
            self.scope.as_char(),
            self.identifier
        );
        if self.scope == RecordScope::DataRow && self.data_row_index >= 0 {
            line.push(DATA_ROW_SEPARATOR);
            line.push_str(&self.data_row_index.to_string());
        }
        line.push(FIELD_SEPARATOR);
        line.push_str(&self.elapsed.to_string());
        line.push(FIELD_SEPARATOR);
        line.push_str(&encoding.encode(self.code));
        if let Some(reason) = &self.reason {
            line.push(FIELD_SEPARATOR);
            line.push_str(reason);
        }
        line
    }
}

const fn info(
    id: ReportCode,
    canonical: &'static str,
    aliases: &'static [&'static str],
    ordinal: u32,
    description: &'static str,
) -> CodeInfo {
    CodeInfo {
        id,
        canonical,
        aliases,
        ordinal,
        description,
    }
}
