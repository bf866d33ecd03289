//! Parser configuration.

use nanotest_core::{CodeEncoding, DeviceType};
use thiserror::Error;

/// Prefix agents put in front of every control record unless configured otherwise.
pub const DEFAULT_REPORT_PREFIX: &str = "nFUnit";

/// Invalid parser configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("report prefix must not be empty")]
    EmptyPrefix,
    #[error("report prefix must be a single line, got {0:?}")]
    MultilinePrefix(String),
    #[error("parser is configured for {configured} devices but the selection was built for {selection} devices")]
    DeviceMismatch {
        configured: DeviceType,
        selection: DeviceType,
    },
}

/// Settings for one [`OutputParser`](super::OutputParser) run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    /// Marks a line as a control record when followed by `:`.
    pub report_prefix: String,
    /// How the agent spells report codes.
    pub code_encoding: CodeEncoding,
    /// Device type the selection must have been built for.
    pub device_type: DeviceType,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            report_prefix: DEFAULT_REPORT_PREFIX.to_string(),
            code_encoding: CodeEncoding::Name,
            device_type: DeviceType::Virtual,
        }
    }
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.report_prefix = prefix.into();
        self
    }

    pub fn with_code_encoding(mut self, encoding: CodeEncoding) -> Self {
        self.code_encoding = encoding;
        self
    }

    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    /// Check the settings before a parser is built from them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.report_prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        if self.report_prefix.contains(['\n', '\r']) {
            return Err(ConfigError::MultilinePrefix(self.report_prefix.clone()));
        }
        Ok(())
    }
}
