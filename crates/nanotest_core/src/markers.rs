//! Test marker capability model.
//!
//! Discovery tools extract markers (attributes, decorators, ...) from compiled modules or sources; how they do that
//! is their business. This module is the closed vocabulary they hand over: every marker kind the model understands,
//! carrying only the data the group builder and the report parser consume.
//!
//! The spelling registry maps external marker names (canonical plus aliases) to a [`MarkerKind`] so downstream
//! code doesn't need stringly-typed comparisons.

use crate::model::DeviceType;

/// Stable identifier for a marker kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
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
}

/// A recognized marker with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestMarker {
    /// Class contains tests.
    TestClass,
    /// Member is a test method.
    TestMethod,
    /// Member is a test method run once per row; arguments are kept for display names.
    DataRow { arguments: Vec<String> },
    Setup { required_config_keys: Vec<String> },
    Cleanup { required_config_keys: Vec<String> },
    Category(String),
    Trait { name: String, value: String },
    /// Restrict the member (or the whole class) to one device type. Several markers accumulate.
    RunOn(DeviceType),
    InstantiatePerTestMethod,
    InstantiateForAllMethods,
    /// Run setup/cleanup around every test instead of once per class.
    SetupCleanupPerTestMethod,
}

impl TestMarker {
    pub fn kind(&self) -> MarkerKind {
        match self {
            TestMarker::TestClass => MarkerKind::TestClass,
            TestMarker::TestMethod => MarkerKind::TestMethod,
            TestMarker::DataRow { .. } => MarkerKind::DataRow,
            TestMarker::Setup { .. } => MarkerKind::Setup,
            TestMarker::Cleanup { .. } => MarkerKind::Cleanup,
            TestMarker::Category(_) => MarkerKind::Category,
            TestMarker::Trait { .. } => MarkerKind::Trait,
            TestMarker::RunOn(DeviceType::Virtual) => MarkerKind::TestOnVirtualDevice,
            TestMarker::RunOn(DeviceType::Real) => MarkerKind::TestOnRealHardware,
            TestMarker::InstantiatePerTestMethod => MarkerKind::InstantiatePerTestMethod,
            TestMarker::InstantiateForAllMethods => MarkerKind::InstantiateForAllMethods,
            TestMarker::SetupCleanupPerTestMethod => MarkerKind::SetupCleanupPerTestMethod,
        }
    }

    /// Build a marker that needs no payload from its kind.
    ///
    /// Returns `None` for kinds that carry data (`DataRow`, `Category`, `Trait`); `Setup` and `Cleanup` come back
    /// with no required configuration keys.
    pub fn flag(kind: MarkerKind) -> Option<TestMarker> {
        match kind {
            MarkerKind::TestClass => Some(TestMarker::TestClass),
            MarkerKind::TestMethod => Some(TestMarker::TestMethod),
            MarkerKind::Setup => Some(TestMarker::Setup {
                required_config_keys: Vec::new(),
            }),
            MarkerKind::Cleanup => Some(TestMarker::Cleanup {
                required_config_keys: Vec::new(),
            }),
            MarkerKind::TestOnVirtualDevice => Some(TestMarker::RunOn(DeviceType::Virtual)),
            MarkerKind::TestOnRealHardware => Some(TestMarker::RunOn(DeviceType::Real)),
            MarkerKind::InstantiatePerTestMethod => Some(TestMarker::InstantiatePerTestMethod),
            MarkerKind::InstantiateForAllMethods => Some(TestMarker::InstantiateForAllMethods),
            MarkerKind::SetupCleanupPerTestMethod => Some(TestMarker::SetupCleanupPerTestMethod),
            MarkerKind::DataRow | MarkerKind::Category | MarkerKind::Trait => None,
        }
    }

    /// Markers that make a member runnable.
    pub fn is_test(&self) -> bool {
        matches!(self, TestMarker::TestMethod | TestMarker::DataRow { .. })
    }
}

/// Registry entry for a marker spelling.
#[derive(Debug, Clone, Copy)]
pub struct MarkerInfo {
    pub id: MarkerKind,
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
    pub description: &'static str,
    /// Whether the marker is valid on a class (as opposed to a member).
    pub on_class: bool,
}

/// Registry of recognized marker spellings.
pub const MARKERS: &[MarkerInfo] = &[
    info(MarkerKind::TestClass, "TestClass", &["TestFixture"], "Class contains tests.", true),
    info(MarkerKind::TestMethod, "TestMethod", &["Test"], "Member is a test method.", false),
    info(MarkerKind::DataRow, "DataRow", &["TestCase"], "Run the test once per data row.", false),
    info(MarkerKind::Setup, "Setup", &["Initialize"], "Member prepares the test class.", false),
    info(MarkerKind::Cleanup, "Cleanup", &["Teardown"], "Member cleans up after the tests.", false),
    info(MarkerKind::Category, "Category", &["TestCategory"], "Assign a test category.", false),
    info(MarkerKind::Trait, "Trait", &["TestProperty"], "Attach a name/value trait.", false),
    info(
        MarkerKind::TestOnVirtualDevice,
        "TestOnVirtualDevice",
        &[],
        "Run on the virtual device.",
        false,
    ),
    info(
        MarkerKind::TestOnRealHardware,
        "TestOnRealHardware",
        &[],
        "Run on real hardware.",
        false,
    ),
    info(
        MarkerKind::InstantiatePerTestMethod,
        "InstantiatePerTestMethod",
        &[],
        "Create a new class instance for every test.",
        true,
    ),
    info(
        MarkerKind::InstantiateForAllMethods,
        "InstantiateForAllMethods",
        &[],
        "Create one class instance for all tests.",
        true,
    ),
    info(
        MarkerKind::SetupCleanupPerTestMethod,
        "SetupCleanupPerTestMethod",
        &[],
        "Run setup and cleanup around every test.",
        true,
    ),
];

/// Resolve a marker spelling to its kind.
pub fn from_str(name: &str) -> Option<MarkerKind> {
    let name = name.strip_suffix("Attribute").unwrap_or(name);
    if let Some(info) = MARKERS.iter().find(|m| m.canonical == name) {
        return Some(info.id);
    }
    MARKERS.iter().find(|m| m.aliases.contains(&name)).map(|m| m.id)
}

/// Return the canonical spelling for a marker kind.
pub fn as_str(id: MarkerKind) -> &'static str {
    info_for(id).map_or("", |m| m.canonical)
}

/// Return the registry entry for a marker kind.
pub fn info_for(id: MarkerKind) -> Option<&'static MarkerInfo> {
    MARKERS.iter().find(|m| m.id == id)
}

const fn info(
    id: MarkerKind,
    canonical: &'static str,
    aliases: &'static [&'static str],
    description: &'static str,
    on_class: bool,
) -> MarkerInfo {
    MarkerInfo {
        id,
        canonical,
        aliases,
        description,
        on_class,
    }
}
