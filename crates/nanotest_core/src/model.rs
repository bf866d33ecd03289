//! Test case model: groups, cases and selections.
//!
//! Everything here is built once (see [`crate::builder`]) and only read afterwards. A [`TestCaseGroup`] is shared
//! by all of its [`TestCase`]s through an `Arc`; a [`TestCaseSelection`] owns the only mutable piece of state, the
//! per-entry selection index.
//!
//! ## Notes
//!
//! - Member ordinals (`test_index`, `setup_method_index`, `cleanup_method_index`) share one ordinal space: the
//!   position of the member among the class's declared members.
//! - `-1` is the "absent" sentinel for member and data-row ordinals, and the "not selected" sentinel for selection
//!   indices. These values travel to and from agents, so they stay plain integers.

use std::fmt;
use std::sync::Arc;

/// Sentinel for an absent member ordinal or a method that is not data-driven.
pub const NO_INDEX: i32 = -1;

/// Sentinel selection index for a case that is not part of the run.
pub const NOT_SELECTED: i32 = -1;

/// Kind of execution agent a test case can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeviceType {
    /// Local virtual runtime.
    Virtual,
    /// Physical device attached to the host.
    Real,
}

impl DeviceType {
    pub const ALL: [DeviceType; 2] = [DeviceType::Virtual, DeviceType::Real];

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::Virtual => "virtual",
            DeviceType::Real => "real",
        }
    }

    pub fn from_str(name: &str) -> Option<DeviceType> {
        match name.to_ascii_lowercase().as_str() {
            "virtual" | "virtualdevice" => Some(DeviceType::Virtual),
            "real" | "realhardware" | "hardware" => Some(DeviceType::Real),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the test class is instantiated while its tests run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstantiationType {
    /// Static class; no instance is ever created.
    #[default]
    NoInstantiation,
    /// A fresh instance for every test method (and every data row).
    InstantiatePerTestMethod,
    /// One instance shared by all test methods of the class.
    InstantiateForAllMethods,
}

/// Declared location of a member in its source file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub file: Option<String>,
    pub line: Option<u32>,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: Some(file.into()),
            line: Some(line),
        }
    }
}

/// A setup or cleanup method declared on a test class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleMethod {
    pub name: String,
    pub location: SourceLocation,
    /// Configuration keys the method expects the run to provide.
    pub required_config_keys: Vec<String>,
}

/// One discovered test class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCaseGroup {
    pub group_index: i32,
    /// Fully qualified class name, as reported in `Class` records.
    pub class_name: String,
    pub instantiation: InstantiationType,
    /// `true`: setup/cleanup (and instantiation) run inside every method or data-row scope.
    /// `false`: they run once, at class scope, shared by all tests of the class.
    pub setup_cleanup_per_test_method: bool,
    /// Only the first entry is authoritative.
    pub setup_methods: Vec<LifecycleMethod>,
    /// Only the first entry is authoritative.
    pub cleanup_methods: Vec<LifecycleMethod>,
    pub setup_method_index: i32,
    pub cleanup_method_index: i32,
}

impl TestCaseGroup {
    pub fn has_setup(&self) -> bool {
        self.setup_method_index >= 0
    }

    pub fn has_cleanup(&self) -> bool {
        self.cleanup_method_index >= 0
    }

    /// The authoritative setup method, if any.
    pub fn setup_method(&self) -> Option<&LifecycleMethod> {
        self.setup_methods.first()
    }

    /// The authoritative cleanup method, if any.
    pub fn cleanup_method(&self) -> Option<&LifecycleMethod> {
        self.cleanup_methods.first()
    }

    /// Whether a class instance is created and later disposed inside each test scope.
    pub fn instantiates_per_test(&self) -> bool {
        self.instantiation != InstantiationType::NoInstantiation && self.setup_cleanup_per_test_method
    }
}

/// Stable display key for a test case: `G{group}T{test}` plus `D{row}` for data-driven cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestCaseId {
    pub group_index: i32,
    pub test_index: i32,
    pub data_row_index: i32,
}

impl fmt::Display for TestCaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G{}T{}", self.group_index, self.test_index)?;
        if self.data_row_index >= 0 {
            write!(f, "D{}", self.data_row_index)?;
        }
        Ok(())
    }
}

/// One runnable unit: method × data row × device type(s).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub test_index: i32,
    pub data_row_index: i32,
    pub group: Arc<TestCaseGroup>,
    pub assembly_file_path: String,
    /// `Namespace.Class.Method`, without any data-row suffix.
    pub fully_qualified_name: String,
    pub display_name: String,
    pub categories: Vec<String>,
    pub traits: Vec<(String, String)>,
    pub location: SourceLocation,
    pub device_types: Vec<DeviceType>,
}

impl TestCase {
    pub fn id(&self) -> TestCaseId {
        TestCaseId {
            group_index: self.group.group_index,
            test_index: self.test_index,
            data_row_index: self.data_row_index,
        }
    }

    pub fn test_case_id(&self) -> String {
        self.id().to_string()
    }

    /// Last segment of the fully qualified name.
    pub fn method_name(&self) -> &str {
        self.fully_qualified_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.fully_qualified_name)
    }

    pub fn is_data_driven(&self) -> bool {
        self.data_row_index >= 0
    }

    pub fn runs_on(&self, device: DeviceType) -> bool {
        self.device_types.contains(&device)
    }

    /// Whether a `Method`/`DataRow` record identifier names this case.
    ///
    /// Accepts the fully qualified method name or the bare method name; `data_row_index` must match exactly
    /// (`NO_INDEX` for method records).
    pub fn matches_method(&self, method: &str, data_row_index: i32) -> bool {
        self.data_row_index == data_row_index && (self.fully_qualified_name == method || self.method_name() == method)
    }
}

/// One entry of a [`TestCaseSelection`].
#[derive(Debug, Clone)]
pub struct SelectedCase {
    pub case: Arc<TestCase>,
    pub selection_index: i32,
}

impl SelectedCase {
    pub fn is_selected(&self) -> bool {
        self.selection_index >= 0
    }
}

/// Ordered test cases of one assembly for one device type.
#[derive(Debug, Clone)]
pub struct TestCaseSelection {
    pub assembly_file_path: String,
    pub device_type: DeviceType,
    entries: Vec<SelectedCase>,
}

impl TestCaseSelection {
    pub fn new(assembly_file_path: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            assembly_file_path: assembly_file_path.into(),
            device_type,
            entries: Vec::new(),
        }
    }

    /// Add a case without selecting it. Returns its position in the selection.
    pub fn push(&mut self, case: Arc<TestCase>) -> usize {
        self.entries.push(SelectedCase {
            case,
            selection_index: NOT_SELECTED,
        });
        self.entries.len() - 1
    }

    /// Mark the entry at `position` as chosen, giving it the next free selection index.
    ///
    /// Returns the selection index, or `None` if `position` is out of range. Selecting an already selected entry
    /// keeps its index.
    pub fn select(&mut self, position: usize) -> Option<i32> {
        let next = self.next_selection_index();
        let entry = self.entries.get_mut(position)?;
        if !entry.is_selected() {
            entry.selection_index = next;
        }
        Some(entry.selection_index)
    }

    /// Select every entry in order.
    pub fn select_all(&mut self) {
        for position in 0..self.entries.len() {
            let _ = self.select(position);
        }
    }

    pub fn deselect(&mut self, position: usize) {
        if let Some(entry) = self.entries.get_mut(position) {
            entry.selection_index = NOT_SELECTED;
        }
    }

    pub fn entries(&self) -> &[SelectedCase] {
        &self.entries
    }

    /// Entries chosen for execution, in selection order of insertion.
    pub fn selected(&self) -> impl Iterator<Item = &SelectedCase> {
        self.entries.iter().filter(|e| e.is_selected())
    }

    pub fn selected_count(&self) -> usize {
        self.selected().count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a class name to the group of a selected case.
    pub fn find_group(&self, class_name: &str) -> Option<&Arc<TestCaseGroup>> {
        self.selected()
            .map(|e| &e.case.group)
            .find(|g| g.class_name == class_name)
    }

    /// Positions of the selected cases of `group` matching a method record.
    pub fn cases_for(&self, group: &TestCaseGroup, method: &str, data_row_index: i32) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                e.is_selected() && e.case.group.group_index == group.group_index && e.case.matches_method(method, data_row_index)
            })
            .map(|(position, _)| position)
            .collect()
    }

    /// Positions of every selected case belonging to `group`.
    pub fn group_positions(&self, group: &TestCaseGroup) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_selected() && e.case.group.group_index == group.group_index)
            .map(|(position, _)| position)
            .collect()
    }

    fn next_selection_index(&self) -> i32 {
        self.entries
            .iter()
            .map(|e| e.selection_index)
            .max()
            .map_or(0, |max| if max < 0 { 0 } else { max + 1 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(index: i32, class_name: &str) -> Arc<TestCaseGroup> {
        Arc::new(TestCaseGroup {
            group_index: index,
            class_name: class_name.to_string(),
            instantiation: InstantiationType::NoInstantiation,
            setup_cleanup_per_test_method: false,
            setup_methods: Vec::new(),
            cleanup_methods: Vec::new(),
            setup_method_index: NO_INDEX,
            cleanup_method_index: NO_INDEX,
        })
    }

    fn case(group: &Arc<TestCaseGroup>, test_index: i32, method: &str, row: i32) -> Arc<TestCase> {
        Arc::new(TestCase {
            test_index,
            data_row_index: row,
            group: Arc::clone(group),
            assembly_file_path: "Tests.pe".to_string(),
            fully_qualified_name: format!("{}.{}", group.class_name, method),
            display_name: method.to_string(),
            categories: Vec::new(),
            traits: Vec::new(),
            location: SourceLocation::default(),
            device_types: DeviceType::ALL.to_vec(),
        })
    }

    #[test]
    fn test_case_id_format() {
        let g = group(3, "A.B");
        assert_eq!(case(&g, 5, "Test", NO_INDEX).test_case_id(), "G3T5");
        assert_eq!(case(&g, 5, "Test", 0).test_case_id(), "G3T5D0");
        assert_eq!(case(&g, 5, "Test", 12).test_case_id(), "G3T5D12");
    }

    #[test]
    fn test_method_name_is_last_segment() {
        let g = group(0, "A.B");
        assert_eq!(case(&g, 0, "Test", NO_INDEX).method_name(), "Test");
    }

    #[test]
    fn test_matches_method_by_qualified_or_bare_name() {
        let g = group(0, "A.B");
        let c = case(&g, 0, "Test", 1);
        assert!(c.matches_method("A.B.Test", 1));
        assert!(c.matches_method("Test", 1));
        assert!(!c.matches_method("A.B.Test", NO_INDEX));
        assert!(!c.matches_method("A.B.Other", 1));
    }

    #[test]
    fn test_select_assigns_consecutive_indices() {
        let g = group(0, "A.B");
        let mut selection = TestCaseSelection::new("Tests.pe", DeviceType::Virtual);
        let first = selection.push(case(&g, 0, "One", NO_INDEX));
        let second = selection.push(case(&g, 1, "Two", NO_INDEX));
        assert_eq!(selection.selected_count(), 0);

        assert_eq!(selection.select(second), Some(0));
        assert_eq!(selection.select(first), Some(1));
        assert_eq!(selection.select(first), Some(1));
        assert_eq!(selection.select(7), None);
        assert_eq!(selection.selected_count(), 2);

        selection.deselect(second);
        assert_eq!(selection.selected_count(), 1);
    }

    #[test]
    fn test_find_group_ignores_unselected_cases() {
        let a = group(0, "A.B");
        let c = group(1, "A.C");
        let mut selection = TestCaseSelection::new("Tests.pe", DeviceType::Virtual);
        selection.push(case(&a, 0, "One", NO_INDEX));
        let pos = selection.push(case(&c, 0, "Two", NO_INDEX));
        selection.select(pos);

        assert!(selection.find_group("A.B").is_none());
        assert_eq!(selection.find_group("A.C").map(|g| g.group_index), Some(1));
    }

    #[test]
    fn test_cases_for_filters_by_group_and_row() {
        let a = group(0, "A.B");
        let mut selection = TestCaseSelection::new("Tests.pe", DeviceType::Virtual);
        selection.push(case(&a, 2, "Rows", 0));
        selection.push(case(&a, 2, "Rows", 1));
        selection.push(case(&a, 3, "Plain", NO_INDEX));
        selection.select_all();

        assert_eq!(selection.cases_for(&a, "A.B.Rows", 1), vec![1]);
        assert_eq!(selection.cases_for(&a, "A.B.Plain", NO_INDEX), vec![2]);
        assert!(selection.cases_for(&a, "A.B.Rows", NO_INDEX).is_empty());
        assert_eq!(selection.group_positions(&a), vec![0, 1, 2]);
    }

    #[test]
    fn test_device_type_spellings() {
        assert_eq!(DeviceType::from_str("Virtual"), Some(DeviceType::Virtual));
        assert_eq!(DeviceType::from_str("hardware"), Some(DeviceType::Real));
        assert_eq!(DeviceType::from_str("toaster"), None);
        assert_eq!(DeviceType::Real.to_string(), "real");
    }
}
