//! Selection manifests.
//!
//! A manifest is the JSON hand-off from a discovery tool: the assembly under test plus every test class with its
//! markers and members. Marker names go through the spelling registry in `nanotest_core::markers`, so any
//! registered alias is accepted.
//!
//! ```json
//! { "assembly": "bin/Tests.pe",
//!   "classes": [ { "name": "NS.Class", "markers": ["TestClass"],
//!                  "members": [ { "name": "Test", "line": 12, "markers": ["TestMethod"] } ] } ] }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use nanotest_core::markers::{self, MarkerKind};
use nanotest_core::{
    ClassDeclaration, DeclaredMember, DeviceType, DiscoveryWarning, GroupBuilder, SourceLocation, TestCaseSelection,
    TestMarker,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Manifest loading errors.
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    #[error("failed to read manifest {}", path.display())]
    #[diagnostic(code(nanotest::manifest::read), help("check that the manifest path exists and is readable"))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse manifest: {0}")]
    #[diagnostic(
        code(nanotest::manifest::parse),
        help("a manifest is a JSON object with an `assembly` path and a `classes` array")
    )]
    Parse(#[from] serde_json::Error),

    #[error("manifest does not name the assembly under test")]
    #[diagnostic(code(nanotest::manifest::assembly), help("set `assembly` to the path of the test assembly"))]
    MissingAssembly,
}

/// Discovered test classes of one assembly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub assembly: String,
    #[serde(default)]
    pub classes: Vec<ManifestClass>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestClass {
    /// Fully qualified class name.
    pub name: String,
    /// Source file the class is declared in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default)]
    pub markers: Vec<String>,
    #[serde(default)]
    pub members: Vec<ManifestMember>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestMember {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(default)]
    pub markers: Vec<String>,
    /// Arguments of each data row; every row becomes its own test case.
    #[serde(default)]
    pub data_rows: Vec<Vec<String>>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub traits: BTreeMap<String, String>,
    /// Configuration keys a setup or cleanup member requires.
    #[serde(default)]
    pub config_keys: Vec<String>,
}

impl Manifest {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let manifest: Manifest = serde_json::from_str(content)?;
        if manifest.assembly.trim().is_empty() {
            return Err(ManifestError::MissingAssembly);
        }
        Ok(manifest)
    }

    /// Build every class and select the cases that run on `device_type`.
    ///
    /// Classes keep their manifest position as group index, so group indices stay stable across device types.
    #[tracing::instrument(skip_all, fields(assembly = %self.assembly, device = %device_type))]
    pub fn selection(&self, device_type: DeviceType) -> (TestCaseSelection, Vec<DiscoveryWarning>) {
        let mut selection = TestCaseSelection::new(self.assembly.clone(), device_type);
        let mut warnings = Vec::new();

        for (index, class) in self.classes.iter().enumerate() {
            let declaration = self.declaration(class, &mut warnings);
            let group_index = i32::try_from(index).unwrap_or(i32::MAX);
            let (built, class_warnings) = GroupBuilder::new().build(&declaration, group_index);
            warnings.extend(class_warnings);
            let Some(built) = built else {
                continue;
            };
            for case in built.cases.into_iter().filter(|case| case.runs_on(device_type)) {
                selection.push(case);
            }
        }
        selection.select_all();

        for warning in &warnings {
            tracing::warn!("{warning}");
        }
        tracing::debug!(cases = selection.len(), warnings = warnings.len(), "selection built");
        (selection, warnings)
    }

    fn declaration(&self, class: &ManifestClass, warnings: &mut Vec<DiscoveryWarning>) -> ClassDeclaration {
        let mut declaration = ClassDeclaration::new(class.name.clone(), self.assembly.clone());
        for name in &class.markers {
            match resolve(name) {
                Some(kind) => match TestMarker::flag(kind) {
                    Some(marker) => declaration.markers.push(marker),
                    None => warnings.push(warning(class, None, format!("marker '{name}' needs data; ignored on a class"))),
                },
                None => warnings.push(warning(class, None, format!("unknown marker '{name}'; ignored"))),
            }
        }

        for member in &class.members {
            let mut declared = DeclaredMember::new(member.name.clone());
            if let (Some(file), Some(line)) = (&class.file, member.line) {
                declared = declared.at(SourceLocation::new(file.clone(), line));
            } else {
                declared.location.line = member.line;
            }

            let mut data_row_marked = false;
            for name in &member.markers {
                let Some(kind) = resolve(name) else {
                    warnings.push(warning(class, Some(member), format!("unknown marker '{name}'; ignored")));
                    continue;
                };
                match kind {
                    MarkerKind::DataRow => data_row_marked = true,
                    // Payload comes from the dedicated fields below.
                    MarkerKind::Category | MarkerKind::Trait => {}
                    MarkerKind::Setup => declared.markers.push(TestMarker::Setup {
                        required_config_keys: member.config_keys.clone(),
                    }),
                    MarkerKind::Cleanup => declared.markers.push(TestMarker::Cleanup {
                        required_config_keys: member.config_keys.clone(),
                    }),
                    kind => declared.markers.extend(TestMarker::flag(kind)),
                }
            }

            if member.data_rows.is_empty() && data_row_marked {
                declared.markers.push(TestMarker::DataRow { arguments: Vec::new() });
            }
            declared.markers.extend(member.data_rows.iter().map(|arguments| TestMarker::DataRow {
                arguments: arguments.clone(),
            }));
            declared
                .markers
                .extend(member.categories.iter().cloned().map(TestMarker::Category));
            declared.markers.extend(member.traits.iter().map(|(name, value)| TestMarker::Trait {
                name: name.clone(),
                value: value.clone(),
            }));

            declaration.members.push(declared);
        }
        declaration
    }
}

fn resolve(name: &str) -> Option<MarkerKind> {
    let kind = markers::from_str(name);
    if kind.is_none() {
        tracing::debug!(marker = name, "unrecognized marker spelling");
    }
    kind
}

fn warning(class: &ManifestClass, member: Option<&ManifestMember>, message: String) -> DiscoveryWarning {
    let location = match (&class.file, member.and_then(|m| m.line)) {
        (Some(file), Some(line)) => SourceLocation::new(file.clone(), line),
        (file, line) => SourceLocation {
            file: file.clone(),
            line,
        },
    };
    DiscoveryWarning {
        class_name: class.name.clone(),
        member: member.map(|m| m.name.clone()),
        location,
        message,
    }
}
