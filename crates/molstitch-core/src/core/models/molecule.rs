use super::atom::Atom;
use super::ids::{AtomId, ResidueId};
use super::residue::Residue;
use super::topology::{Bond, BondOrder};
use crate::core::geometry;
use crate::core::graph::connectivity::{ConnectivityGraph, GraphError};
use nalgebra::Point3;
use slotmap::SlotMap;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StructureError {
    #[error("Atom {0:?} does not exist in this molecule")]
    AtomNotFound(AtomId),
    #[error("Residue {0:?} does not exist in this molecule")]
    ResidueNotFound(ResidueId),
    #[error("Graph/bond-list divergence: {0}")]
    Inconsistent(String),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// A molecular fragment: an ordered collection of residues, a bond list,
/// and a derived connectivity graph.
///
/// The bond list and the graph are kept in sync by the molecule's own
/// methods. Code that edits atoms or bonds through [`Molecule::graph_mut`]
/// or other direct means must call [`Molecule::rebuild_graph`] afterwards;
/// resynchronization is a documented invariant, not automatic.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    pub id: String,
    atoms: SlotMap<AtomId, Atom>,
    residues: SlotMap<ResidueId, Residue>,
    residue_order: Vec<ResidueId>,
    bonds: Vec<Bond>,
    graph: ConnectivityGraph,
    root_atom: Option<AtomId>,
    attach_residue: Option<ResidueId>,
}

impl Molecule {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Self::default()
        }
    }

    // --- residues ---

    /// Appends a new residue and returns its ID.
    pub fn add_residue(&mut self, number: isize, name: &str) -> ResidueId {
        let residue_id = self.residues.insert(Residue::new(number, name));
        self.residue_order.push(residue_id);
        residue_id
    }

    pub fn residue(&self, id: ResidueId) -> Option<&Residue> {
        self.residues.get(id)
    }

    /// Iterates residues in their molecule order.
    pub fn residues_iter(&self) -> impl Iterator<Item = (ResidueId, &Residue)> {
        self.residue_order
            .iter()
            .map(move |&id| (id, &self.residues[id]))
    }

    pub fn residue_count(&self) -> usize {
        self.residue_order.len()
    }

    pub fn last_residue(&self) -> Option<ResidueId> {
        self.residue_order.last().copied()
    }

    /// Removes a residue and all its atoms (and therefore all bonds that
    /// referenced them). Remaining serials are recompacted to `1..=N`.
    pub fn remove_residue(&mut self, residue_id: ResidueId) -> Option<Residue> {
        let atom_ids = self.residues.get(residue_id)?.atoms().to_vec();
        for atom_id in atom_ids {
            self.remove_atom(atom_id);
        }
        self.residue_order.retain(|&id| id != residue_id);
        if self.attach_residue == Some(residue_id) {
            self.attach_residue = None;
        }
        self.residues.remove(residue_id)
    }

    // --- atoms ---

    /// Adds an atom to a residue, assigning the next serial number. The
    /// atom's residue back-id is set to `residue_id`.
    pub fn add_atom(&mut self, residue_id: ResidueId, mut atom: Atom) -> Result<AtomId, StructureError> {
        if !self.residues.contains_key(residue_id) {
            return Err(StructureError::ResidueNotFound(residue_id));
        }
        atom.residue_id = residue_id;
        atom.serial = self.atoms.len() + 1;
        let name = atom.name.clone();
        let atom_id = self.atoms.insert(atom);
        self.residues[residue_id].add_atom(&name, atom_id);
        self.graph.add_node(atom_id);
        Ok(atom_id)
    }

    pub fn atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id)
    }

    pub fn atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id)
    }

    pub fn atoms_iter(&self) -> impl Iterator<Item = (AtomId, &Atom)> {
        self.atoms.iter()
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Resolves a serial number to an atom ID (linear scan).
    pub fn atom_by_serial(&self, serial: usize) -> Option<AtomId> {
        self.atoms
            .iter()
            .find(|(_, atom)| atom.serial == serial)
            .map(|(id, _)| id)
    }

    /// Resolves an atom by name within a residue.
    pub fn find_atom(&self, residue_id: ResidueId, name: &str) -> Option<AtomId> {
        self.residues
            .get(residue_id)
            .and_then(|residue| residue.get_first_atom_id_by_name(name))
    }

    /// Removes an atom atomically: its residue entry, its graph node, and
    /// every referencing bond. Remaining serials are recompacted to `1..=N`.
    pub fn remove_atom(&mut self, atom_id: AtomId) -> Option<Atom> {
        let atom = self.atoms.remove(atom_id)?;
        if let Some(residue) = self.residues.get_mut(atom.residue_id) {
            residue.remove_atom(&atom.name, atom_id);
        }
        self.bonds.retain(|bond| !bond.contains(atom_id));
        self.graph.remove_node(atom_id);
        if self.root_atom == Some(atom_id) {
            self.root_atom = None;
        }
        self.reserialize();
        Some(atom)
    }

    /// Reassigns serial numbers contiguously `1..=N`, following residue
    /// order and atom insertion order within each residue.
    pub fn reserialize(&mut self) {
        let mut serial = 1;
        for &residue_id in &self.residue_order {
            for &atom_id in self.residues[residue_id].atoms() {
                self.atoms[atom_id].serial = serial;
                serial += 1;
            }
        }
    }

    // --- bonds ---

    /// Adds a bond and mirrors it as a graph edge. Idempotent: an existing
    /// bond between the two atoms is left untouched.
    pub fn add_bond(
        &mut self,
        atom1_id: AtomId,
        atom2_id: AtomId,
        order: BondOrder,
    ) -> Result<(), StructureError> {
        if !self.atoms.contains_key(atom1_id) {
            return Err(StructureError::AtomNotFound(atom1_id));
        }
        if !self.atoms.contains_key(atom2_id) {
            return Err(StructureError::AtomNotFound(atom2_id));
        }
        if self.graph.has_edge(atom1_id, atom2_id) {
            return Ok(());
        }
        self.bonds.push(Bond::new(atom1_id, atom2_id, order));
        self.graph.add_edge(atom1_id, atom2_id, order)?;
        Ok(())
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn bond_between(&self, a: AtomId, b: AtomId) -> Option<&Bond> {
        self.bonds
            .iter()
            .find(|bond| bond.contains(a) && bond.contains(b))
    }

    /// Bonds whose endpoints both belong to the given residue.
    pub fn bonds_within_residue(&self, residue_id: ResidueId) -> Vec<Bond> {
        self.bonds
            .iter()
            .filter(|bond| {
                let a = self.atoms.get(bond.atom1_id);
                let b = self.atoms.get(bond.atom2_id);
                matches!((a, b), (Some(a), Some(b))
                    if a.residue_id == residue_id && b.residue_id == residue_id)
            })
            .copied()
            .collect()
    }

    // --- graph access ---

    pub fn graph(&self) -> &ConnectivityGraph {
        &self.graph
    }

    /// Mutable access to the connectivity graph, e.g. for edge locking.
    /// Structural edits made here bypass the bond list; callers must
    /// restore consistency via [`Molecule::rebuild_graph`].
    pub fn graph_mut(&mut self) -> &mut ConnectivityGraph {
        &mut self.graph
    }

    /// Rebuilds the graph from the atom and bond lists. Locks on edges that
    /// still exist are preserved.
    pub fn rebuild_graph(&mut self) {
        let locked: Vec<_> = self.graph.locked_edges().collect();
        let mut graph = ConnectivityGraph::new();
        for atom_id in self.atoms.keys() {
            graph.add_node(atom_id);
        }
        for bond in &self.bonds {
            let _ = graph.add_edge(bond.atom1_id, bond.atom2_id, bond.order);
        }
        for (a, b) in locked {
            let _ = graph.lock_edge(a, b);
        }
        self.graph = graph;
    }

    /// Checks the edge↔bond one-to-one invariant. Divergence is fatal and
    /// never auto-repaired.
    pub fn validate(&self) -> Result<(), StructureError> {
        for bond in &self.bonds {
            if !self.atoms.contains_key(bond.atom1_id) || !self.atoms.contains_key(bond.atom2_id) {
                return Err(StructureError::Inconsistent(format!(
                    "bond {:?}-{:?} references a removed atom",
                    bond.atom1_id, bond.atom2_id
                )));
            }
            if !self.graph.has_edge(bond.atom1_id, bond.atom2_id) {
                return Err(StructureError::Inconsistent(format!(
                    "bond {:?}-{:?} has no graph edge",
                    bond.atom1_id, bond.atom2_id
                )));
            }
        }
        if self.graph.edge_count() != self.bonds.len() {
            return Err(StructureError::Inconsistent(format!(
                "{} graph edges vs {} bonds",
                self.graph.edge_count(),
                self.bonds.len()
            )));
        }
        Ok(())
    }

    // --- join defaults ---

    pub fn root_atom(&self) -> Option<AtomId> {
        self.root_atom
    }

    pub fn set_root_atom(&mut self, atom_id: AtomId) -> Result<(), StructureError> {
        if !self.atoms.contains_key(atom_id) {
            return Err(StructureError::AtomNotFound(atom_id));
        }
        self.root_atom = Some(atom_id);
        Ok(())
    }

    pub fn attach_residue(&self) -> Option<ResidueId> {
        self.attach_residue
    }

    pub fn set_attach_residue(&mut self, residue_id: ResidueId) -> Result<(), StructureError> {
        if !self.residues.contains_key(residue_id) {
            return Err(StructureError::ResidueNotFound(residue_id));
        }
        self.attach_residue = Some(residue_id);
        Ok(())
    }

    // --- rotation ---

    /// Computes the coordinates a rotation about the edge n1→n2 would
    /// produce without applying them. The pivot `n2` keeps its position.
    pub fn preview_rotation(
        &self,
        n1: AtomId,
        n2: AtomId,
        angle: f64,
        descendants_only: bool,
    ) -> Result<Vec<(AtomId, Point3<f64>)>, StructureError> {
        let targets = self.graph.rotation_targets(n1, n2, descendants_only)?;
        let p1 = self
            .atoms
            .get(n1)
            .ok_or(StructureError::AtomNotFound(n1))?
            .position;
        let p2 = self
            .atoms
            .get(n2)
            .ok_or(StructureError::AtomNotFound(n2))?
            .position;
        let axis = geometry::normalized_axis(p2 - p1)
            .map_err(|_| StructureError::Graph(GraphError::DegenerateAxis))?;

        Ok(targets
            .into_iter()
            .map(|id| {
                let rotated = geometry::rotate_about_line(&self.atoms[id].position, &p2, &axis, angle);
                (id, rotated)
            })
            .collect())
    }

    /// Rotates part of the molecule about the edge n1→n2 by `angle` radians
    /// (descendants of the edge only, or the whole molecule). Fails on a
    /// locked edge, a non-adjacent pair, or a degenerate axis.
    pub fn rotate_around_edge(
        &mut self,
        n1: AtomId,
        n2: AtomId,
        angle: f64,
        descendants_only: bool,
    ) -> Result<(), StructureError> {
        for (atom_id, position) in self.preview_rotation(n1, n2, angle, descendants_only)? {
            self.atoms[atom_id].position = position;
        }
        Ok(())
    }

    /// Applies a rigid transform to every atom position.
    pub fn apply_transform(&mut self, transform: &geometry::RigidTransform) {
        for (_, atom) in self.atoms.iter_mut() {
            atom.position = transform.apply(&atom.position);
        }
    }

    // --- combination ---

    /// Copies one residue of `other` into this molecule, including the
    /// bonds internal to that residue. Returns the old→new atom-id map.
    pub fn copy_residue_from(
        &mut self,
        other: &Molecule,
        residue_id: ResidueId,
    ) -> Result<HashMap<AtomId, AtomId>, StructureError> {
        let residue = other
            .residue(residue_id)
            .ok_or(StructureError::ResidueNotFound(residue_id))?;
        let new_residue_id = self.add_residue(residue.number, &residue.name);

        let mut map = HashMap::new();
        for &atom_id in residue.atoms() {
            let atom = other.atoms[atom_id].clone();
            let new_id = self.add_atom(new_residue_id, atom)?;
            map.insert(atom_id, new_id);
        }
        for bond in other.bonds_within_residue(residue_id) {
            self.add_bond(map[&bond.atom1_id], map[&bond.atom2_id], bond.order)?;
        }
        Ok(map)
    }

    /// Merges `source` into this molecule: residues are appended in order
    /// (renumbered past this molecule's highest residue number), bonds and
    /// graph edges migrate through fresh atom IDs, and edge locks are
    /// carried over. Serials are reassigned contiguously. Returns the
    /// source→merged atom-id map.
    pub fn merge(&mut self, source: Molecule) -> HashMap<AtomId, AtomId> {
        let number_offset = self
            .residue_order
            .iter()
            .map(|&id| self.residues[id].number)
            .max()
            .unwrap_or(0);

        let mut map = HashMap::with_capacity(source.atoms.len());
        let mut source_atoms = source.atoms;
        for &residue_id in &source.residue_order {
            let residue = &source.residues[residue_id];
            let new_residue_id = self.add_residue(number_offset + residue.number, &residue.name);
            for &atom_id in residue.atoms() {
                let atom = source_atoms
                    .remove(atom_id)
                    .expect("residue atom lists only reference owned atoms");
                let new_id = self
                    .add_atom(new_residue_id, atom)
                    .expect("the residue was just created");
                map.insert(atom_id, new_id);
            }
        }
        for bond in &source.bonds {
            self.add_bond(map[&bond.atom1_id], map[&bond.atom2_id], bond.order)
                .expect("merged bond endpoints were just inserted");
        }
        for (a, b) in source.graph.locked_edges() {
            if let (Some(&a), Some(&b)) = (map.get(&a), map.get(&b)) {
                let _ = self.graph.lock_edge(a, b);
            }
        }
        self.reserialize();
        map
    }
}
