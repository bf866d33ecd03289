//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use nanotest::manifest::Manifest;
use nanotest::report::{CollectingSink, OutputParser, ParserConfig};
use nanotest::{DeviceType, TestCaseSelection, TestResult};

pub const PREFIX: &str = "PFX";

/// Three classes: shared setup/cleanup, per-test setup/cleanup, and neither.
pub const MANIFEST: &str = r#"{
    "assembly": "bin/Tests.pe",
    "classes": [
        {
            "name": "NS.Shared",
            "markers": ["TestClass"],
            "members": [
                { "name": "Init", "markers": ["Setup"] },
                { "name": "Passes", "markers": ["TestMethod"] },
                { "name": "Fails", "markers": ["TestMethod"] },
                { "name": "Rows", "data_rows": [["1"], ["2"]] },
                { "name": "Finish", "markers": ["Cleanup"] }
            ]
        },
        {
            "name": "NS.PerTest",
            "markers": ["TestClass", "SetupCleanupPerTestMethod", "InstantiatePerTestMethod"],
            "members": [
                { "name": "Init", "markers": ["Setup"] },
                { "name": "First", "markers": ["TestMethod"] },
                { "name": "Second", "markers": ["TestMethod"] },
                { "name": "Finish", "markers": ["Cleanup"] }
            ]
        },
        {
            "name": "NS.Plain",
            "markers": ["TestClass"],
            "members": [ { "name": "Only", "markers": ["TestMethod"] } ]
        }
    ]
}"#;

pub fn selection() -> TestCaseSelection {
    let manifest = Manifest::parse(MANIFEST).unwrap();
    let (selection, warnings) = manifest.selection(DeviceType::Virtual);
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
    selection
}

pub fn config() -> ParserConfig {
    ParserConfig::new().with_report_prefix(PREFIX)
}

pub fn parser() -> OutputParser<CollectingSink> {
    OutputParser::new(selection(), &config(), CollectingSink::new()).unwrap()
}

/// Feed `log` in one call, flush, and return every result in emission order.
pub fn run(log: &str) -> Vec<TestResult> {
    let mut parser = parser();
    parser.add_output(log);
    parser.flush();
    parser.into_sink().results
}

/// Join lines with `\n`, including a trailing terminator.
pub fn log(lines: &[&str]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn find<'a>(results: &'a [TestResult], display_name: &str) -> &'a TestResult {
    results
        .iter()
        .find(|r| r.display_name == display_name)
        .unwrap_or_else(|| panic!("no result for {display_name}"))
}
