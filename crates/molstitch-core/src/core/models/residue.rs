use super::ids::AtomId;
use std::collections::HashMap;

/// An ordered, owning container of atoms.
///
/// Atom names are usually unique within a residue, but duplicates are
/// tolerated; name lookups therefore resolve to a list of IDs in insertion
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Residue {
    /// Residue sequence number within the molecule.
    pub number: isize,
    /// Name of the residue (e.g. "GLC", "SER").
    pub name: String,
    pub(crate) atoms: Vec<AtomId>,
    atom_name_map: HashMap<String, Vec<AtomId>>,
}

impl Residue {
    pub(crate) fn new(number: isize, name: &str) -> Self {
        Self {
            number,
            name: name.to_string(),
            atoms: Vec::new(),
            atom_name_map: HashMap::new(),
        }
    }

    pub(crate) fn add_atom(&mut self, atom_name: &str, atom_id: AtomId) {
        self.atoms.push(atom_id);
        self.atom_name_map
            .entry(atom_name.to_string())
            .or_default()
            .push(atom_id);
    }

    pub(crate) fn remove_atom(&mut self, atom_name: &str, atom_id: AtomId) {
        self.atoms.retain(|&id| id != atom_id);
        if let Some(ids) = self.atom_name_map.get_mut(atom_name) {
            ids.retain(|&id| id != atom_id);
            if ids.is_empty() {
                self.atom_name_map.remove(atom_name);
            }
        }
    }

    /// The atom IDs of this residue in insertion order.
    pub fn atoms(&self) -> &[AtomId] {
        &self.atoms
    }

    /// Resolves an atom name to the first matching atom ID.
    pub fn get_first_atom_id_by_name(&self, name: &str) -> Option<AtomId> {
        self.atom_name_map.get(name).and_then(|ids| ids.first()).copied()
    }

    /// Resolves an atom name to all matching atom IDs.
    pub fn get_atom_ids_by_name(&self, name: &str) -> Option<&[AtomId]> {
        self.atom_name_map.get(name).map(|ids| ids.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    fn dummy_atom_id(n: u64) -> AtomId {
        AtomId::from(KeyData::from_ffi(n))
    }

    #[test]
    fn new_residue_initializes_fields_correctly() {
        let residue = Residue::new(3, "GLC");
        assert_eq!(residue.number, 3);
        assert_eq!(residue.name, "GLC");
        assert!(residue.atoms().is_empty());
        assert!(residue.get_first_atom_id_by_name("C1").is_none());
    }

    #[test]
    fn add_atom_preserves_insertion_order_and_maps_names() {
        let mut residue = Residue::new(1, "GLC");
        let c1 = dummy_atom_id(1);
        let o1 = dummy_atom_id(2);
        residue.add_atom("C1", c1);
        residue.add_atom("O1", o1);

        assert_eq!(residue.atoms(), &[c1, o1]);
        assert_eq!(residue.get_first_atom_id_by_name("C1"), Some(c1));
        assert_eq!(residue.get_first_atom_id_by_name("O1"), Some(o1));
    }

    #[test]
    fn duplicate_names_resolve_to_all_ids_in_order() {
        let mut residue = Residue::new(1, "LIG");
        let h1 = dummy_atom_id(1);
        let h2 = dummy_atom_id(2);
        residue.add_atom("H", h1);
        residue.add_atom("H", h2);

        assert_eq!(residue.get_atom_ids_by_name("H").unwrap(), &[h1, h2]);
        assert_eq!(residue.get_first_atom_id_by_name("H"), Some(h1));
    }

    #[test]
    fn remove_atom_only_drops_the_matching_id() {
        let mut residue = Residue::new(1, "LIG");
        let h1 = dummy_atom_id(1);
        let h2 = dummy_atom_id(2);
        residue.add_atom("H", h1);
        residue.add_atom("H", h2);

        residue.remove_atom("H", h1);

        assert_eq!(residue.atoms(), &[h2]);
        assert_eq!(residue.get_atom_ids_by_name("H").unwrap(), &[h2]);

        residue.remove_atom("H", h2);
        assert!(residue.get_atom_ids_by_name("H").is_none());
        assert!(residue.atoms().is_empty());
    }
}
