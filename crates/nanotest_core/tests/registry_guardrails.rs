use std::collections::HashMap;

use nanotest_core::markers;
use nanotest_core::protocol::{self, CodeEncoding};

#[test]
fn report_code_spellings_unique_and_resolvable() {
    let mut seen: HashMap<&'static str, protocol::ReportCode> = HashMap::new();

    for info in protocol::REPORT_CODES {
        assert_eq!(
            protocol::from_str(info.canonical),
            Some(info.id),
            "report code canonical spelling not resolvable: {}",
            info.canonical
        );
        assert_eq!(info.id.as_str(), info.canonical, "report code as_str mismatch for {:?}", info.id);

        if let Some(prev) = seen.insert(info.canonical, info.id) {
            panic!("duplicate report code spelling {:?}: {:?} and {:?}", info.canonical, prev, info.id);
        }

        for &alias in info.aliases {
            assert_eq!(
                protocol::from_str(alias),
                Some(info.id),
                "report code alias not resolvable: {}",
                alias
            );
            if let Some(prev) = seen.insert(alias, info.id) {
                panic!("duplicate report code alias {:?}: {:?} and {:?}", alias, prev, info.id);
            }
        }
    }
}

#[test]
fn report_code_ordinals_unique() {
    let mut seen: HashMap<u32, protocol::ReportCode> = HashMap::new();
    for info in protocol::REPORT_CODES {
        if let Some(prev) = seen.insert(info.ordinal, info.id) {
            panic!("duplicate ordinal {}: {:?} and {:?}", info.ordinal, prev, info.id);
        }
        assert_eq!(CodeEncoding::Ordinal.decode(&info.ordinal.to_string()), Some(info.id));
    }
}

#[test]
fn report_code_spellings_are_not_numeric() {
    // A numeric spelling would make name-encoded runs ambiguous with ordinal-encoded ones.
    for info in protocol::REPORT_CODES {
        for spelling in std::iter::once(&info.canonical).chain(info.aliases.iter()) {
            assert!(
                spelling.parse::<u32>().is_err(),
                "report code spelling {:?} parses as an ordinal",
                spelling
            );
        }
    }
}

#[test]
fn marker_spellings_unique_and_resolvable() {
    let mut seen: HashMap<&'static str, markers::MarkerKind> = HashMap::new();

    for info in markers::MARKERS {
        assert_eq!(
            markers::from_str(info.canonical),
            Some(info.id),
            "marker canonical spelling not resolvable: {}",
            info.canonical
        );
        assert_eq!(markers::as_str(info.id), info.canonical);

        if let Some(prev) = seen.insert(info.canonical, info.id) {
            panic!("duplicate marker spelling {:?}: {:?} and {:?}", info.canonical, prev, info.id);
        }
        for &alias in info.aliases {
            assert_eq!(markers::from_str(alias), Some(info.id), "marker alias not resolvable: {}", alias);
            if let Some(prev) = seen.insert(alias, info.id) {
                panic!("duplicate marker alias {:?}: {:?} and {:?}", alias, prev, info.id);
            }
        }
    }
}

#[test]
fn every_marker_kind_is_registered() {
    use markers::MarkerKind::*;
    for kind in [
        TestClass,
        TestMethod,
        DataRow,
        Setup,
        Cleanup,
        Category,
        Trait,
        TestOnVirtualDevice,
        TestOnRealHardware,
        InstantiatePerTestMethod,
        InstantiateForAllMethods,
        SetupCleanupPerTestMethod,
    ] {
        assert!(markers::info_for(kind).is_some(), "marker {:?} missing from registry", kind);
    }
}
