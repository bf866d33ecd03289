//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use nanotest_core::{CodeEncoding, DeviceType, TestCaseSelection, TestResult};

use crate::manifest::Manifest;
use crate::report::{OutputParser, ParserConfig};

use super::reporter::{ConsoleReporter, RunSummary, TestReporter};
use super::{CliError, CliResult, ExitCode};

/// Bytes handed to the parser per call when replaying a log.
pub const CHUNK_SIZE: usize = 4096;

/// Load a manifest and build the selection for one device type.
pub fn load_selection(manifest_path: &Path, device: DeviceType) -> CliResult<TestCaseSelection> {
    let manifest = Manifest::load(manifest_path).map_err(|err| {
        let report = miette::Report::new(err);
        CliError::failure(format!("{report:?}"))
    })?;
    let (selection, _warnings) = manifest.selection(device);
    Ok(selection)
}

/// Print every selected case: id, fully qualified name and display name.
pub fn list_cases(manifest_path: &Path, device: DeviceType) -> CliResult<ExitCode> {
    let selection = load_selection(manifest_path, device)?;
    if selection.is_empty() {
        eprintln!("No tests collected");
        return Ok(ExitCode::SUCCESS);
    }
    for entry in selection.selected() {
        let case = &entry.case;
        println!("{}\t{}\t{}", case.test_case_id(), case.fully_qualified_name, case.display_name);
    }
    Ok(ExitCode::SUCCESS)
}

/// Options of the `replay` command.
#[derive(Debug, Clone)]
pub struct ReplayOptions<'a> {
    pub manifest: &'a Path,
    pub device: DeviceType,
    pub prefix: Option<String>,
    pub ordinal_codes: bool,
    pub verbose: bool,
    /// Captured output; stdin when `None`.
    pub log: Option<&'a Path>,
}

/// Parse a captured agent log against a manifest and report the results.
pub fn replay(options: ReplayOptions<'_>) -> CliResult<ExitCode> {
    let mut config = ParserConfig::new().with_device_type(options.device);
    if let Some(prefix) = options.prefix {
        config = config.with_report_prefix(prefix);
    }
    if options.ordinal_codes {
        config = config.with_code_encoding(CodeEncoding::Ordinal);
    }

    let selection = load_selection(options.manifest, config.device_type)?;

    let mut reporter = ConsoleReporter::new(options.verbose);
    let summary = match options.log {
        Some(path) => {
            let file = File::open(path)
                .map_err(|e| CliError::failure(format!("Error reading log {}: {}", path.display(), e)))?;
            replay_reader(selection, &config, file, &mut reporter)?
        }
        None => replay_reader(selection, &config, io::stdin().lock(), &mut reporter)?,
    };

    Ok(if summary.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Feed `reader` to a parser in fixed-size chunks, reporting results as they arrive.
pub fn replay_reader<R: Read, T: TestReporter>(
    selection: TestCaseSelection,
    config: &ParserConfig,
    mut reader: R,
    reporter: &mut T,
) -> CliResult<RunSummary> {
    reporter.on_collection_complete(selection.selected_count());

    let mut summary = RunSummary::default();
    let sink = |batch: Vec<TestResult>| {
        for result in &batch {
            summary.record(result);
            reporter.on_result(result);
        }
    };
    let mut parser =
        OutputParser::new(selection, config, sink).map_err(|e| CliError::failure(format!("Error: {e}")))?;

    let mut chunk = [0u8; CHUNK_SIZE];
    loop {
        let read = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(CliError::failure(format!("Error reading output: {e}"))),
        };
        parser.add_output_bytes(&chunk[..read]);
    }
    parser.flush();
    drop(parser);

    reporter.on_run_complete(&summary);
    Ok(summary)
}
