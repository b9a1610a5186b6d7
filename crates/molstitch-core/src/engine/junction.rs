//! Shared anchor and leaving-atom resolution for both join pathways.

use tracing::warn;

use super::error::JoinError;
use crate::core::linkage::{DeleteSide, LinkageSpec};
use crate::core::models::ids::{AtomId, ResidueId};
use crate::core::models::molecule::Molecule;

/// The residue a fragment joins at: the explicit attach residue when set,
/// otherwise the last residue of a target and the first residue of a source.
pub(crate) fn host_residue(molecule: &Molecule, side: DeleteSide) -> Result<ResidueId, JoinError> {
    let fallback = match side {
        DeleteSide::Target => molecule.last_residue(),
        DeleteSide::Source => molecule.residues_iter().next().map(|(id, _)| id),
    };
    molecule
        .attach_residue()
        .or(fallback)
        .ok_or(JoinError::MissingResidue { side })
}

/// Resolves the anchor atom carrying the new bond: by linkage name in the
/// host residue, falling back to the fragment's designated root atom.
pub(crate) fn resolve_anchor(
    molecule: &Molecule,
    residue_id: ResidueId,
    name: &str,
    side: DeleteSide,
) -> Result<AtomId, JoinError> {
    molecule
        .find_atom(residue_id, name)
        .or(molecule.root_atom())
        .ok_or_else(|| JoinError::MissingAnchor {
            side,
            name: name.to_string(),
        })
}

/// Rejects a linkage that flags the anchor atom itself for deletion; the
/// anchor has to survive to carry the new bond.
pub(crate) fn ensure_anchor_survives(
    molecule: &Molecule,
    anchor: AtomId,
    linkage: &LinkageSpec,
    side: DeleteSide,
) -> Result<(), JoinError> {
    if let Some(atom) = molecule.atom(anchor) {
        if linkage.deletes(side).contains(&atom.name.as_str()) {
            return Err(JoinError::AnchorFlaggedForDeletion {
                side,
                name: atom.name.clone(),
            });
        }
    }
    Ok(())
}

/// The flagged leaving atom bonded to the anchor. Its position defines where
/// the other fragment's anchor lands during alignment.
pub(crate) fn leaving_neighbor(
    molecule: &Molecule,
    residue_id: ResidueId,
    anchor: AtomId,
    linkage: &LinkageSpec,
    side: DeleteSide,
) -> Result<AtomId, JoinError> {
    let residue = molecule
        .residue(residue_id)
        .ok_or(JoinError::MissingResidue { side })?;
    for name in linkage.deletes(side) {
        for &atom_id in residue.get_atom_ids_by_name(name).unwrap_or_default() {
            if molecule.graph().has_edge(anchor, atom_id) {
                return Ok(atom_id);
            }
        }
    }
    Err(JoinError::NoLeavingNeighbor {
        side,
        anchor: molecule
            .atom(anchor)
            .map(|atom| atom.name.clone())
            .unwrap_or_default(),
    })
}

/// Removes the atoms a linkage flags on one side. Flagged names absent from
/// the host residue are skipped, not errors.
pub(crate) fn remove_flagged_atoms(
    molecule: &mut Molecule,
    residue_id: ResidueId,
    linkage: &LinkageSpec,
    side: DeleteSide,
) {
    for name in linkage.deletes(side) {
        let atom_ids: Vec<AtomId> = molecule
            .residue(residue_id)
            .and_then(|residue| residue.get_atom_ids_by_name(name))
            .map(|ids| ids.to_vec())
            .unwrap_or_default();
        if atom_ids.is_empty() {
            warn!(atom = name, %side, "flagged leaving atom not present, skipping");
            continue;
        }
        for atom_id in atom_ids {
            molecule.remove_atom(atom_id);
        }
    }
}

/// Resolves every bond descriptor of the linkage to concrete atom pairs,
/// the primary bond through the already-resolved anchors.
pub(crate) fn resolve_bond_endpoints(
    target: &Molecule,
    target_residue: ResidueId,
    target_anchor: AtomId,
    source: &Molecule,
    source_residue: ResidueId,
    source_anchor: AtomId,
    linkage: &LinkageSpec,
) -> Result<Vec<(AtomId, AtomId)>, JoinError> {
    let mut pairs = Vec::with_capacity(linkage.bonds().len());
    for (index, (target_name, source_name)) in linkage.bonds().iter().enumerate() {
        if index == 0 {
            pairs.push((target_anchor, source_anchor));
            continue;
        }
        let target_atom =
            target
                .find_atom(target_residue, target_name)
                .ok_or_else(|| JoinError::MissingAnchor {
                    side: DeleteSide::Target,
                    name: target_name.clone(),
                })?;
        let source_atom =
            source
                .find_atom(source_residue, source_name)
                .ok_or_else(|| JoinError::MissingAnchor {
                    side: DeleteSide::Source,
                    name: source_name.clone(),
                })?;
        pairs.push((target_atom, source_atom));
    }
    Ok(pairs)
}
