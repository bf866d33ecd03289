//! Build groups and test cases from declared class members.
//!
//! Input is the declarative output of discovery: a class with its markers and its members in declaration order,
//! each member with its own markers. Output is one shared [`TestCaseGroup`] and the expanded [`TestCase`]s
//! (one per test method, or one per data row of a data-driven method).
//!
//! ## Notes
//!
//! - Member ordinals are positions in `members`; test, setup and cleanup indices all use them.
//! - Only the first setup and the first cleanup member count. Later ones become [`DiscoveryWarning`]s, which the
//!   caller decides how to surface.

use std::fmt;
use std::sync::Arc;

use crate::markers::TestMarker;
use crate::model::{
    DeviceType, InstantiationType, LifecycleMethod, NO_INDEX, SourceLocation, TestCase, TestCaseGroup,
};

/// One member of a test class, as discovered.
#[derive(Debug, Clone, Default)]
pub struct DeclaredMember {
    pub name: String,
    pub location: SourceLocation,
    pub markers: Vec<TestMarker>,
}

impl DeclaredMember {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    pub fn with_marker(mut self, marker: TestMarker) -> Self {
        self.markers.push(marker);
        self
    }
}

/// One test class, as discovered.
#[derive(Debug, Clone, Default)]
pub struct ClassDeclaration {
    pub class_name: String,
    pub assembly_file_path: String,
    pub markers: Vec<TestMarker>,
    pub members: Vec<DeclaredMember>,
}

impl ClassDeclaration {
    pub fn new(class_name: impl Into<String>, assembly_file_path: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            assembly_file_path: assembly_file_path.into(),
            ..Default::default()
        }
    }

    pub fn with_marker(mut self, marker: TestMarker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn with_member(mut self, member: DeclaredMember) -> Self {
        self.members.push(member);
        self
    }
}

/// A non-fatal problem found while building a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryWarning {
    pub class_name: String,
    pub member: Option<String>,
    pub location: SourceLocation,
    pub message: String,
}

impl fmt::Display for DiscoveryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let (Some(file), Some(line)) = (&self.location.file, self.location.line) {
            write!(f, "{file}({line}): ")?;
        }
        match &self.member {
            Some(member) => write!(f, "{}.{}: {}", self.class_name, member, self.message),
            None => write!(f, "{}: {}", self.class_name, self.message),
        }
    }
}

/// Result of building one class.
#[derive(Debug, Clone)]
pub struct BuiltGroup {
    pub group: Arc<TestCaseGroup>,
    pub cases: Vec<Arc<TestCase>>,
}

/// Turns a [`ClassDeclaration`] into a group and its test cases.
#[derive(Debug, Default)]
pub struct GroupBuilder {
    warnings: Vec<DiscoveryWarning>,
}

impl GroupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the class with the given group index.
    ///
    /// Returns `None` (plus warnings) when the class declares no test method.
    pub fn build(mut self, class: &ClassDeclaration, group_index: i32) -> (Option<BuiltGroup>, Vec<DiscoveryWarning>) {
        let instantiation = self.instantiation(class);
        let setup_cleanup_per_test_method = class
            .markers
            .iter()
            .any(|m| matches!(m, TestMarker::SetupCleanupPerTestMethod));

        let mut setup: Option<(i32, LifecycleMethod)> = None;
        let mut cleanup: Option<(i32, LifecycleMethod)> = None;
        for (ordinal, member) in class.members.iter().enumerate() {
            let ordinal = ordinal_of(ordinal);
            for marker in &member.markers {
                match marker {
                    TestMarker::Setup { required_config_keys } => {
                        self.take_first(class, member, ordinal, required_config_keys, &mut setup, "setup");
                    }
                    TestMarker::Cleanup { required_config_keys } => {
                        self.take_first(class, member, ordinal, required_config_keys, &mut cleanup, "cleanup");
                    }
                    _ => {}
                }
            }
        }

        let (setup_method_index, setup_methods) = split_lifecycle(setup);
        let (cleanup_method_index, cleanup_methods) = split_lifecycle(cleanup);
        let group = Arc::new(TestCaseGroup {
            group_index,
            class_name: class.class_name.clone(),
            instantiation,
            setup_cleanup_per_test_method,
            setup_methods,
            cleanup_methods,
            setup_method_index,
            cleanup_method_index,
        });

        let class_devices = devices_of(&class.markers);
        let mut cases = Vec::new();
        for (ordinal, member) in class.members.iter().enumerate() {
            if !member.markers.iter().any(TestMarker::is_test) {
                continue;
            }
            let ordinal = ordinal_of(ordinal);
            if ordinal == group.setup_method_index || ordinal == group.cleanup_method_index {
                self.warn(class, Some(member), "setup/cleanup member is also marked as a test; it will run as a test too");
            }

            let mut devices = devices_of(&member.markers);
            if devices.is_empty() {
                devices = class_devices.clone();
            }
            if devices.is_empty() {
                devices = DeviceType::ALL.to_vec();
            }

            let categories: Vec<String> = member
                .markers
                .iter()
                .filter_map(|m| match m {
                    TestMarker::Category(name) => Some(name.clone()),
                    _ => None,
                })
                .collect();
            let traits: Vec<(String, String)> = member
                .markers
                .iter()
                .filter_map(|m| match m {
                    TestMarker::Trait { name, value } => Some((name.clone(), value.clone())),
                    _ => None,
                })
                .collect();

            let rows: Vec<&Vec<String>> = member
                .markers
                .iter()
                .filter_map(|m| match m {
                    TestMarker::DataRow { arguments } => Some(arguments),
                    _ => None,
                })
                .collect();

            let make_case = |data_row_index: i32, display_name: String| {
                Arc::new(TestCase {
                    test_index: ordinal,
                    data_row_index,
                    group: Arc::clone(&group),
                    assembly_file_path: class.assembly_file_path.clone(),
                    fully_qualified_name: format!("{}.{}", class.class_name, member.name),
                    display_name,
                    categories: categories.clone(),
                    traits: traits.clone(),
                    location: member.location.clone(),
                    device_types: devices.clone(),
                })
            };

            if rows.is_empty() {
                cases.push(make_case(NO_INDEX, member.name.clone()));
            } else {
                for (row, arguments) in rows.iter().enumerate() {
                    cases.push(make_case(ordinal_of(row), data_row_display_name(&member.name, row, arguments)));
                }
            }
        }

        if cases.is_empty() {
            self.warn(class, None, "class declares no test method; skipped");
            return (None, self.warnings);
        }

        (Some(BuiltGroup { group, cases }), self.warnings)
    }

    fn instantiation(&mut self, class: &ClassDeclaration) -> InstantiationType {
        let mut chosen: Option<InstantiationType> = None;
        for marker in &class.markers {
            let kind = match marker {
                TestMarker::InstantiatePerTestMethod => InstantiationType::InstantiatePerTestMethod,
                TestMarker::InstantiateForAllMethods => InstantiationType::InstantiateForAllMethods,
                _ => continue,
            };
            match chosen {
                None => chosen = Some(kind),
                Some(existing) if existing != kind => {
                    self.warn(class, None, "conflicting instantiation markers; the first one is used");
                }
                Some(_) => {}
            }
        }
        chosen.unwrap_or_default()
    }

    fn take_first(
        &mut self,
        class: &ClassDeclaration,
        member: &DeclaredMember,
        ordinal: i32,
        required_config_keys: &[String],
        slot: &mut Option<(i32, LifecycleMethod)>,
        what: &str,
    ) {
        if let Some((_, first)) = slot {
            let message = format!("only one {what} method is supported; '{}' is used and this one is ignored", first.name);
            self.warn(class, Some(member), &message);
            return;
        }
        *slot = Some((
            ordinal,
            LifecycleMethod {
                name: member.name.clone(),
                location: member.location.clone(),
                required_config_keys: required_config_keys.to_vec(),
            },
        ));
    }

    fn warn(&mut self, class: &ClassDeclaration, member: Option<&DeclaredMember>, message: &str) {
        self.warnings.push(DiscoveryWarning {
            class_name: class.class_name.clone(),
            member: member.map(|m| m.name.clone()),
            location: member.map(|m| m.location.clone()).unwrap_or_default(),
            message: message.to_string(),
        });
    }
}

fn split_lifecycle(slot: Option<(i32, LifecycleMethod)>) -> (i32, Vec<LifecycleMethod>) {
    match slot {
        Some((index, method)) => (index, vec![method]),
        None => (NO_INDEX, Vec::new()),
    }
}

fn devices_of(markers: &[TestMarker]) -> Vec<DeviceType> {
    let mut devices: Vec<DeviceType> = markers
        .iter()
        .filter_map(|m| match m {
            TestMarker::RunOn(device) => Some(*device),
            _ => None,
        })
        .collect();
    devices.sort();
    devices.dedup();
    devices
}

fn data_row_display_name(method: &str, row: usize, arguments: &[String]) -> String {
    if arguments.is_empty() {
        format!("{method} #{row}")
    } else {
        format!("{method}({})", arguments.join(", "))
    }
}

fn ordinal_of(position: usize) -> i32 {
    i32::try_from(position).unwrap_or(i32::MAX)
}
