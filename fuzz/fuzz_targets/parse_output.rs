#![no_main]

use libfuzzer_sys::fuzz_target;
use nanotest::manifest::Manifest;
use nanotest::report::{CollectingSink, OutputParser, ParserConfig};
use nanotest::DeviceType;

const MANIFEST: &str = r#"{
    "assembly": "Tests.pe",
    "classes": [
        { "name": "A.Shared", "markers": ["TestClass"],
          "members": [ { "name": "Init", "markers": ["Setup"] },
                       { "name": "One", "markers": ["TestMethod"] },
                       { "name": "Rows", "data_rows": [["1"], ["2"]] } ] },
        { "name": "A.PerTest", "markers": ["TestClass", "SetupCleanupPerTestMethod", "InstantiatePerTestMethod"],
          "members": [ { "name": "Two", "markers": ["TestMethod"] },
                       { "name": "Done", "markers": ["Cleanup"] } ] }
    ]
}"#;

fuzz_target!(|data: &[u8]| {
    let Ok(manifest) = Manifest::parse(MANIFEST) else {
        return;
    };
    let (selection, _) = manifest.selection(DeviceType::Virtual);
    let expected = selection.selected_count();
    let Ok(mut parser) = OutputParser::new(selection, &ParserConfig::new().with_report_prefix("F"), CollectingSink::new())
    else {
        return;
    };

    // The first byte picks a chunk size so boundaries land everywhere.
    let (size, rest) = data.split_first().map_or((1, data), |(&b, rest)| (usize::from(b).max(1), rest));
    for chunk in rest.chunks(size) {
        parser.add_output_bytes(chunk);
    }
    parser.flush();
    assert_eq!(parser.into_sink().results.len(), expected);
});
