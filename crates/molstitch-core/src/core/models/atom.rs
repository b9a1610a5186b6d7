use super::ids::ResidueId;
use nalgebra::Point3;

/// Represents an atom in a molecular fragment.
///
/// The `name` is the atom's stable identifier and is unique within its parent
/// residue (e.g. "C1", "O4", "HO3"). The `serial` is a process-scoped number
/// that is reassigned whenever the owning molecule reindexes its atoms; after
/// any merge or deletion serials are contiguous `1..=N`.
///
/// Atoms reference their parent residue by ID rather than holding a live
/// back-reference, so the connectivity graph can own its adjacency outright.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The stable name of the atom, unique within its residue.
    pub name: String,
    /// The chemical element symbol (e.g. "C", "O", "Br").
    pub element: String,
    /// The ID of the parent residue this atom belongs to.
    pub residue_id: ResidueId,
    /// Process-scoped serial number, reassigned on reindexing.
    pub serial: usize,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
}

impl Atom {
    /// Creates a new atom. The serial number is assigned by the owning
    /// molecule when the atom is inserted.
    pub fn new(name: &str, element: &str, residue_id: ResidueId, position: Point3<f64>) -> Self {
        Self {
            name: name.to_string(),
            element: element.to_string(),
            residue_id,
            serial: 0,
            position,
        }
    }
}
