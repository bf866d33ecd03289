//! Protocol record decoder.
//!
//! Classifies one complete output line as either a control record or plain text. Decoding fails closed: a line
//! that carries the report prefix but does not match the record grammar is plain text, so corrupted transport bytes
//! degrade into captured output instead of aborting the parse.

use nanotest_core::protocol::{DATA_ROW_SEPARATOR, FIELD_SEPARATOR};
use nanotest_core::{CodeEncoding, ProtocolRecord, RecordScope};

/// Classification of one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    Record(ProtocolRecord),
    Text(&'a str),
}

/// Decodes control records for one run.
#[derive(Debug, Clone)]
pub struct RecordDecoder {
    prefix: String,
    encoding: CodeEncoding,
}

impl RecordDecoder {
    pub fn new(prefix: impl Into<String>, encoding: CodeEncoding) -> Self {
        Self {
            prefix: prefix.into(),
            encoding,
        }
    }

    pub fn classify<'a>(&self, line: &'a str) -> Line<'a> {
        match self.decode(line) {
            Some(record) => Line::Record(record),
            None => Line::Text(line),
        }
    }

    /// Decode `prefix:ScopeChar:Identifier:ElapsedTicks:Code[:Reason]`.
    ///
    /// Everything after the fifth separator is the reason, verbatim (it may contain separators itself).
    pub fn decode(&self, line: &str) -> Option<ProtocolRecord> {
        let rest = line.strip_prefix(self.prefix.as_str())?.strip_prefix(FIELD_SEPARATOR)?;
        let record = self.decode_fields(rest);
        if record.is_none() {
            tracing::trace!(line, "line carries the report prefix but is not a record");
        }
        record
    }

    fn decode_fields(&self, rest: &str) -> Option<ProtocolRecord> {
        let mut fields = rest.splitn(5, FIELD_SEPARATOR);

        let scope = {
            let field = fields.next()?;
            let mut chars = field.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            RecordScope::from_char(c)?
        };

        let identifier = fields.next().filter(|s| !s.is_empty())?;
        let elapsed = fields.next()?.parse::<u64>().ok()?;
        let code = self.encoding.decode(fields.next()?)?;
        let reason = fields.next().map(str::to_string);

        let (identifier, data_row_index) = match scope {
            RecordScope::DataRow => {
                let (method, row) = identifier.rsplit_once(DATA_ROW_SEPARATOR)?;
                if method.is_empty() {
                    return None;
                }
                (method, row.parse::<u32>().ok().and_then(|r| i32::try_from(r).ok())?)
            }
            RecordScope::Class | RecordScope::Method => (identifier, -1),
        };

        Some(ProtocolRecord {
            scope,
            identifier: identifier.to_string(),
            data_row_index,
            elapsed,
            code,
            reason,
        })
    }
}
