use super::linkage::{DeleteSide, InternalCoordinate, LinkageError, LinkageSpec};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
struct RawInternalCoordinate {
    atoms: Vec<String>,
    values: Vec<f64>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
struct RawLinkage {
    bonds: Vec<[String; 2]>,
    #[serde(default)]
    delete_in_target: Vec<String>,
    #[serde(default)]
    delete_in_source: Vec<String>,
    #[serde(default)]
    internal_coordinates: Vec<RawInternalCoordinate>,
}

#[derive(Debug, Deserialize)]
struct RawLibrary {
    #[serde(default)]
    linkages: HashMap<String, RawLinkage>,
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid linkage '{key}': {source}")]
    Linkage { key: String, source: LinkageError },
}

/// A library of named linkage recipes, loaded from a TOML file.
///
/// This is an explicit configuration object threaded through calls; there is
/// no process-wide default library. Lookup is a pure read.
#[derive(Debug, Clone, Default)]
pub struct LinkageLibrary {
    linkages: HashMap<String, LinkageSpec>,
}

impl LinkageLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a library from a TOML file of the form:
    ///
    /// ```toml
    /// [linkages."14bb"]
    /// bonds = [["C1", "O4"]]
    /// delete_in_target = ["O1", "HO1"]
    /// delete_in_source = ["HO4"]
    ///
    /// [[linkages."14bb".internal_coordinates]]
    /// atoms = ["1C1", "1O1", "2C4", "2H4"]
    /// values = [1.43, 1.52, 109.0, 111.0, 180.0]
    /// ```
    ///
    /// Internal-coordinate arity (4 atoms, 5 values) is validated at load.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let content = std::fs::read_to_string(path).map_err(|e| TemplateError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::parse_with_label(&content, &path.to_string_lossy())
    }

    fn parse_with_label(content: &str, label: &str) -> Result<Self, TemplateError> {
        let raw: RawLibrary = toml::from_str(content).map_err(|e| TemplateError::Toml {
            path: label.to_string(),
            source: e,
        })?;

        let mut linkages = HashMap::with_capacity(raw.linkages.len());
        for (key, raw_linkage) in raw.linkages {
            let spec = build_linkage(&key, raw_linkage).map_err(|source| {
                TemplateError::Linkage {
                    key: key.clone(),
                    source,
                }
            })?;
            linkages.insert(key, spec);
        }
        Ok(Self { linkages })
    }

    /// Registers a linkage programmatically under a key.
    pub fn insert(&mut self, key: &str, spec: LinkageSpec) {
        self.linkages.insert(key.to_string(), spec);
    }

    /// Resolves a key to its linkage, or `None` when the key is unknown.
    pub fn get(&self, key: &str) -> Option<&LinkageSpec> {
        self.linkages.get(key)
    }

    pub fn len(&self) -> usize {
        self.linkages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.linkages.is_empty()
    }
}

fn build_linkage(key: &str, raw: RawLinkage) -> Result<LinkageSpec, LinkageError> {
    let mut bonds = raw.bonds.iter();
    let first = bonds.next().ok_or(LinkageError::NoBond)?;
    let mut spec = LinkageSpec::new(&first[0], &first[1]).with_id(key);
    for bond in bonds {
        spec.add_bond(&bond[0], &bond[1]);
    }
    for name in &raw.delete_in_target {
        spec.add_delete(name, Some(DeleteSide::Target))?;
    }
    for name in &raw.delete_in_source {
        spec.add_delete(name, Some(DeleteSide::Source))?;
    }
    for raw_ic in &raw.internal_coordinates {
        let ic = InternalCoordinate::from_parts(&raw_ic.atoms, &raw_ic.values)?;
        spec.add_internal_coordinate(ic);
    }
    Ok(spec)
}

impl FromStr for LinkageLibrary {
    type Err = TemplateError;

    /// Parses a library directly from TOML text (path-less counterpart of
    /// [`LinkageLibrary::load`]).
    fn from_str(content: &str) -> Result<Self, Self::Err> {
        Self::parse_with_label(content, "<inline>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::linkage::JoinStrategy;
    use std::io::Write;

    const LIBRARY_TOML: &str = r#"
[linkages."14bb"]
bonds = [["C1", "O4"]]
delete_in_target = ["O1", "HO1"]
delete_in_source = ["HO4"]

[linkages.peptide]
bonds = [["C", "N"]]
delete_in_target = ["OXT", "HXT"]
delete_in_source = ["H2"]

[[linkages.peptide.internal_coordinates]]
atoms = ["1CA", "1C", "2N", "2CA"]
values = [1.52, 1.46, 116.5, 121.7, 180.0]
"#;

    #[test]
    fn parses_a_library_with_and_without_internal_coordinates() {
        let library: LinkageLibrary = LIBRARY_TOML.parse().unwrap();
        assert_eq!(library.len(), 2);

        let recipe = library.get("14bb").unwrap();
        assert_eq!(recipe.strategy(), JoinStrategy::Search);
        assert_eq!(recipe.primary_bond().unwrap(), ("C1", "O4"));
        assert_eq!(recipe.deletes(DeleteSide::Target), vec!["O1", "HO1"]);
        assert_eq!(recipe.deletes(DeleteSide::Source), vec!["HO4"]);

        let patch = library.get("peptide").unwrap();
        assert_eq!(patch.strategy(), JoinStrategy::Geometric);
        assert_eq!(patch.internal_coordinates().len(), 1);
        assert_eq!(patch.internal_coordinates()[0].dihedral, 180.0);
    }

    #[test]
    fn unknown_keys_resolve_to_none() {
        let library: LinkageLibrary = LIBRARY_TOML.parse().unwrap();
        assert!(library.get("16bb").is_none());
    }

    #[test]
    fn load_reads_the_same_content_from_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(LIBRARY_TOML.as_bytes()).unwrap();

        let library = LinkageLibrary::load(file.path()).unwrap();
        assert_eq!(library.len(), 2);
        assert!(library.get("peptide").is_some());
    }

    #[test]
    fn load_surfaces_io_errors_with_the_path() {
        let error = LinkageLibrary::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(error, TemplateError::Io { .. }));
        assert!(error.to_string().contains("/definitely/not/here.toml"));
    }

    #[test]
    fn bad_internal_coordinate_arity_fails_at_load() {
        let toml = r#"
[linkages.bad]
bonds = [["C1", "O4"]]

[[linkages.bad.internal_coordinates]]
atoms = ["1C1", "1O1", "2C4"]
values = [1.43, 1.52, 109.0, 111.0, 180.0]
"#;
        let error = toml.parse::<LinkageLibrary>().unwrap_err();
        match error {
            TemplateError::Linkage { key, source } => {
                assert_eq!(key, "bad");
                assert_eq!(source, LinkageError::InternalCoordinateAtomArity(3));
            }
            other => panic!("expected a linkage error, got {other:?}"),
        }
    }

    #[test]
    fn linkage_without_bonds_fails_at_load() {
        let toml = r#"
[linkages.empty]
bonds = []
"#;
        let error = toml.parse::<LinkageLibrary>().unwrap_err();
        assert!(matches!(
            error,
            TemplateError::Linkage {
                source: LinkageError::NoBond,
                ..
            }
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let toml = r#"
[linkages.typo]
bonds = [["C1", "O4"]]
delete_in_targett = ["O1"]
"#;
        assert!(matches!(
            toml.parse::<LinkageLibrary>(),
            Err(TemplateError::Toml { .. })
        ));
    }
}
