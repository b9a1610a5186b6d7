use std::collections::HashMap;

use tracing::{debug, instrument};

use super::config::JoinConfig;
use super::error::JoinError;
use super::junction;
use super::optimizer::{OptimizationRequest, OptimizerError, RotationOptimizer};
use crate::core::geometry;
use crate::core::linkage::{DeleteSide, LinkageSpec};
use crate::core::models::ids::AtomId;
use crate::core::models::molecule::{Molecule, StructureError};
use crate::core::models::topology::BondOrder;

/// The search-based join: aligns the source fragment onto the target's
/// junction frame, removes the leaving atoms, lets an external optimizer
/// pick angles for the rotatable edges of the junction, and merges.
///
/// Failures before deletion leave both fragments untouched in principle,
/// but the API consumes them either way; callers needing the originals back
/// on error should join clones.
pub struct Stitcher<'a> {
    config: &'a JoinConfig,
    optimizer: &'a dyn RotationOptimizer,
}

impl<'a> Stitcher<'a> {
    pub fn new(config: &'a JoinConfig, optimizer: &'a dyn RotationOptimizer) -> Self {
        Self { config, optimizer }
    }

    /// Joins `source` onto `target` with anchors resolved from the linkage.
    #[instrument(skip_all, fields(linkage = linkage.id.as_deref().unwrap_or("<anonymous>")))]
    pub fn join(
        &self,
        target: Molecule,
        source: Molecule,
        linkage: &LinkageSpec,
    ) -> Result<Molecule, JoinError> {
        self.join_at(target, source, linkage, None)
    }

    /// Joins with an explicit anchor pair, bypassing name resolution.
    pub fn join_at(
        &self,
        mut target: Molecule,
        mut source: Molecule,
        linkage: &LinkageSpec,
        anchors: Option<(AtomId, AtomId)>,
    ) -> Result<Molecule, JoinError> {
        let (target_name, source_name) = linkage.primary_bond()?;
        let target_residue = junction::host_residue(&target, DeleteSide::Target)?;
        let source_residue = junction::host_residue(&source, DeleteSide::Source)?;
        let (target_anchor, source_anchor) = match anchors {
            Some(pair) => pair,
            None => (
                junction::resolve_anchor(&target, target_residue, target_name, DeleteSide::Target)?,
                junction::resolve_anchor(&source, source_residue, source_name, DeleteSide::Source)?,
            ),
        };
        junction::ensure_anchor_survives(&target, target_anchor, linkage, DeleteSide::Target)?;
        junction::ensure_anchor_survives(&source, source_anchor, linkage, DeleteSide::Source)?;
        let target_leaving = junction::leaving_neighbor(
            &target,
            target_residue,
            target_anchor,
            linkage,
            DeleteSide::Target,
        )?;
        let source_leaving = junction::leaving_neighbor(
            &source,
            source_residue,
            source_anchor,
            linkage,
            DeleteSide::Source,
        )?;

        // Land the source anchor where the target's leaving atom sits, with
        // the source's leaving atom pointing back at the target anchor.
        let position = |molecule: &Molecule, id: AtomId| -> Result<_, JoinError> {
            Ok(molecule
                .atom(id)
                .ok_or(StructureError::AtomNotFound(id))?
                .position)
        };
        let mobile = [
            position(&source, source_anchor)?,
            position(&source, source_leaving)?,
        ];
        let landmarks = [
            position(&target, target_leaving)?,
            position(&target, target_anchor)?,
        ];
        let transform = geometry::superposition(&mobile, &landmarks)?;
        source.apply_transform(&transform);

        junction::remove_flagged_atoms(&mut target, target_residue, linkage, DeleteSide::Target);
        junction::remove_flagged_atoms(&mut source, source_residue, linkage, DeleteSide::Source);

        // Temporary two-residue sub-structure: the conformer search sees the
        // junction and nothing else.
        let mut junction_mol = Molecule::new("junction");
        let target_map = junction_mol.copy_residue_from(&target, target_residue)?;
        let source_map = junction_mol.copy_residue_from(&source, source_residue)?;
        junction_mol.add_bond(
            target_map[&target_anchor],
            source_map[&source_anchor],
            BondOrder::Single,
        )?;
        junction_mol.reserialize();

        let mut edges = junction_mol
            .graph()
            .find_rotatable_edges(Some(target_map[&target_anchor]), &self.config.rotatable_bounds)?;
        let serial_of = |id: AtomId| junction_mol.atom(id).map(|atom| atom.serial).unwrap_or(0);
        edges.sort_by_key(|&(a, b)| (serial_of(a), serial_of(b)));
        debug!(edge_count = edges.len(), "enumerated junction edges");

        let angles = self.optimizer.optimize(OptimizationRequest {
            structure: &junction_mol,
            edges: &edges,
        })?;
        if angles.len() != edges.len() {
            return Err(OptimizerError::AngleCountMismatch {
                expected: edges.len(),
                found: angles.len(),
            }
            .into());
        }
        // Pending rotation policy, still in junction-local ids.
        let policy: Vec<((AtomId, AtomId), f64)> = edges.into_iter().zip(angles).collect();

        let bond_pairs = junction::resolve_bond_endpoints(
            &target,
            target_residue,
            target_anchor,
            &source,
            source_residue,
            source_anchor,
            linkage,
        )?;

        let merge_map = target.merge(source);
        for (target_atom, source_atom) in bond_pairs {
            target.add_bond(target_atom, merge_map[&source_atom], BondOrder::Single)?;
        }

        // Apply the policy on the merged molecule, edge by edge, rotating
        // only the descendants of each edge.
        let mut to_merged: HashMap<AtomId, AtomId> = HashMap::new();
        for (original, local) in &target_map {
            to_merged.insert(*local, *original);
        }
        for (original, local) in &source_map {
            to_merged.insert(*local, merge_map[original]);
        }
        for ((a, b), angle) in policy {
            if angle == 0.0 {
                continue;
            }
            target.rotate_around_edge(to_merged[&a], to_merged[&b], angle, true)?;
        }

        Ok(target)
    }
}
