use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkageError {
    #[error("An internal coordinate requires exactly 4 atom ids, got {0}")]
    InternalCoordinateAtomArity(usize),
    #[error("An internal coordinate requires exactly 5 values, got {0}")]
    InternalCoordinateValueArity(usize),
    #[error(
        "Delete id '{0}' carries no side marker; prefix it with '1' (target) or '2' (source), or pass the side explicitly"
    )]
    UnresolvableDeleteSide(String),
    #[error("A linkage requires at least one bond descriptor")]
    NoBond,
}

/// Which fragment of a join a delete id refers to: side 1 is the target
/// (receiving) fragment, side 2 the source (incoming) fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeleteSide {
    Target,
    Source,
}

impl FromStr for DeleteSide {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "target" | "1" => Ok(Self::Target),
            "source" | "2" => Ok(Self::Source),
            _ => Err(()),
        }
    }
}

impl fmt::Display for DeleteSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target => write!(f, "target"),
            Self::Source => write!(f, "source"),
        }
    }
}

/// One row of an internal-coordinate table: four atom references and the
/// geometry of the quadruple. Atom references on the source side carry a
/// leading `'2'` marker, target-side ones a leading `'1'` (CHARMM-patch
/// convention). Angles and dihedrals are in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalCoordinate {
    pub atoms: [String; 4],
    /// Bond length between atoms 1 and 2, in Angstroms.
    pub bond_length_12: f64,
    /// Bond length between atoms 3 and 4, in Angstroms.
    pub bond_length_34: f64,
    /// Bond angle 1-2-3, in degrees.
    pub angle_123: f64,
    /// Bond angle 2-3-4, in degrees.
    pub angle_234: f64,
    /// Dihedral 1-2-3-4, in degrees.
    pub dihedral: f64,
}

impl InternalCoordinate {
    /// Builds an internal coordinate from a raw key/value pair, enforcing
    /// the 4-atom / 5-value arity.
    pub fn from_parts(atoms: &[String], values: &[f64]) -> Result<Self, LinkageError> {
        let atoms: [String; 4] = atoms
            .to_vec()
            .try_into()
            .map_err(|v: Vec<String>| LinkageError::InternalCoordinateAtomArity(v.len()))?;
        let [bond_length_12, bond_length_34, angle_123, angle_234, dihedral]: [f64; 5] = values
            .to_vec()
            .try_into()
            .map_err(|v: Vec<f64>| LinkageError::InternalCoordinateValueArity(v.len()))?;
        Ok(Self {
            atoms,
            bond_length_12,
            bond_length_34,
            angle_123,
            angle_234,
            dihedral,
        })
    }
}

/// How a linkage is applied: geometrically from explicit internal
/// coordinates, or through rigid superposition plus conformer search.
/// Resolved once at construction time, not branched per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinStrategy {
    /// Purely geometric join driven by the internal-coordinate table.
    Geometric,
    /// Superposition + numeric conformer search (stitch).
    #[default]
    Search,
}

/// A declarative join recipe: the bond(s) to form between two fragments,
/// the atoms each side loses in the process, and optionally the internal
/// coordinates of the atoms around the new bond.
///
/// A `LinkageSpec` is immutable input to a single join; it is never retained
/// in the product molecule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinkageSpec {
    pub id: Option<String>,
    bonds: Vec<(String, String)>,
    deletes: Vec<(DeleteSide, String)>,
    internal_coords: Vec<InternalCoordinate>,
    strategy: JoinStrategy,
}

impl LinkageSpec {
    /// Creates a search-based linkage ("recipe") forming one bond between
    /// `atom1` on the target and `atom2` on the source.
    pub fn new(atom1: &str, atom2: &str) -> Self {
        Self {
            id: None,
            bonds: vec![(atom1.to_string(), atom2.to_string())],
            deletes: Vec::new(),
            internal_coords: Vec::new(),
            strategy: JoinStrategy::Search,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Convenience constructor for a full search recipe.
    pub fn recipe(
        atom1: &str,
        atom2: &str,
        delete_in_target: &[&str],
        delete_in_source: &[&str],
    ) -> Self {
        let mut spec = Self::new(atom1, atom2);
        for name in delete_in_target {
            spec.add_delete(name, Some(DeleteSide::Target))
                .expect("explicit side is always resolvable");
        }
        for name in delete_in_source {
            spec.add_delete(name, Some(DeleteSide::Source))
                .expect("explicit side is always resolvable");
        }
        spec
    }

    pub fn add_bond(&mut self, atom1: &str, atom2: &str) {
        self.bonds.push((atom1.to_string(), atom2.to_string()));
    }

    /// Registers an atom to delete. Without an explicit side the id must
    /// carry a leading `'1'` (target) or `'2'` (source) marker, which is
    /// stripped from the stored name.
    pub fn add_delete(&mut self, id: &str, side: Option<DeleteSide>) -> Result<(), LinkageError> {
        let (side, name) = match side {
            Some(side) => (side, id),
            None => {
                let mut chars = id.chars();
                let side = chars
                    .next()
                    .and_then(|marker| DeleteSide::from_str(&marker.to_string()).ok())
                    .ok_or_else(|| LinkageError::UnresolvableDeleteSide(id.to_string()))?;
                (side, chars.as_str())
            }
        };
        self.deletes.push((side, name.to_string()));
        Ok(())
    }

    /// Adds an internal-coordinate row; the linkage becomes a geometric
    /// ("patch") join from the first row on.
    pub fn add_internal_coordinate(&mut self, ic: InternalCoordinate) {
        self.internal_coords.push(ic);
        self.strategy = JoinStrategy::Geometric;
    }

    pub fn strategy(&self) -> JoinStrategy {
        self.strategy
    }

    /// The bonds to form, as (target atom name, source atom name) pairs.
    pub fn bonds(&self) -> &[(String, String)] {
        &self.bonds
    }

    /// The first bond descriptor; every valid linkage has at least one.
    pub fn primary_bond(&self) -> Result<(&str, &str), LinkageError> {
        self.bonds
            .first()
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .ok_or(LinkageError::NoBond)
    }

    /// Delete ids for one side, markers already stripped.
    pub fn deletes(&self, side: DeleteSide) -> Vec<&str> {
        self.deletes
            .iter()
            .filter(|(s, _)| *s == side)
            .map(|(_, name)| name.as_str())
            .collect()
    }

    pub fn internal_coordinates(&self) -> &[InternalCoordinate] {
        &self.internal_coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ic_atoms() -> Vec<String> {
        ["1C1", "1O1", "2C4", "2H4"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn recipe_collects_bond_and_sided_deletes() {
        let spec = LinkageSpec::recipe("C1", "O4", &["O1", "HO1"], &["HO4"]);
        assert_eq!(spec.primary_bond().unwrap(), ("C1", "O4"));
        assert_eq!(spec.deletes(DeleteSide::Target), vec!["O1", "HO1"]);
        assert_eq!(spec.deletes(DeleteSide::Source), vec!["HO4"]);
        assert_eq!(spec.strategy(), JoinStrategy::Search);
    }

    #[test]
    fn delete_side_markers_are_folded_into_the_id() {
        let mut spec = LinkageSpec::new("C1", "O4");
        spec.add_delete("1HO1", None).unwrap();
        spec.add_delete("2HO4", None).unwrap();

        assert_eq!(spec.deletes(DeleteSide::Target), vec!["HO1"]);
        assert_eq!(spec.deletes(DeleteSide::Source), vec!["HO4"]);
    }

    #[test]
    fn unmarked_delete_without_a_side_fails() {
        let mut spec = LinkageSpec::new("C1", "O4");
        assert_eq!(
            spec.add_delete("HO1", None),
            Err(LinkageError::UnresolvableDeleteSide("HO1".to_string()))
        );
        assert!(spec.deletes(DeleteSide::Target).is_empty());
    }

    #[test]
    fn internal_coordinates_switch_the_strategy_to_geometric() {
        let mut spec = LinkageSpec::new("C1", "O4");
        let ic =
            InternalCoordinate::from_parts(&ic_atoms(), &[1.43, 1.52, 109.0, 111.0, 180.0])
                .unwrap();
        spec.add_internal_coordinate(ic);

        assert_eq!(spec.strategy(), JoinStrategy::Geometric);
        assert_eq!(spec.internal_coordinates().len(), 1);
        let ic = &spec.internal_coordinates()[0];
        assert_eq!(ic.bond_length_12, 1.43);
        assert_eq!(ic.bond_length_34, 1.52);
        assert_eq!(ic.angle_123, 109.0);
        assert_eq!(ic.angle_234, 111.0);
        assert_eq!(ic.dihedral, 180.0);
    }

    #[test]
    fn internal_coordinate_arity_is_validated() {
        let three: Vec<String> = ic_atoms().into_iter().take(3).collect();
        assert_eq!(
            InternalCoordinate::from_parts(&three, &[1.0, 2.0, 3.0, 4.0, 5.0]),
            Err(LinkageError::InternalCoordinateAtomArity(3))
        );
        assert_eq!(
            InternalCoordinate::from_parts(&ic_atoms(), &[1.0, 2.0]),
            Err(LinkageError::InternalCoordinateValueArity(2))
        );
    }

    #[test]
    fn empty_linkage_has_no_primary_bond() {
        let spec = LinkageSpec::default();
        assert_eq!(spec.primary_bond(), Err(LinkageError::NoBond));
    }
}
