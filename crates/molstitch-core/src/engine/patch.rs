//! The geometric join: rebuilds the junction from an internal-coordinate
//! table instead of searching conformers.

use std::collections::HashMap;

use nalgebra::Point3;
use tracing::{debug, instrument};

use super::error::JoinError;
use super::junction;
use crate::core::geometry;
use crate::core::linkage::{DeleteSide, InternalCoordinate, LinkageSpec};
use crate::core::models::ids::ResidueId;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;

/// A rigid superposition needs three non-collinear pairs to fix all six
/// degrees of freedom.
const MIN_REFERENCE_POINTS: usize = 3;

/// Joins `source` onto `target` purely from the linkage's internal
/// coordinates: ideal positions for the source-side junction atoms are
/// constructed from the target's actual geometry, the source fragment is
/// superposed onto them, leaving atoms are removed, and the fragments merge.
/// No conformer optimization takes place.
#[instrument(skip_all, fields(linkage = linkage.id.as_deref().unwrap_or("<anonymous>")))]
pub fn join(
    mut target: Molecule,
    mut source: Molecule,
    linkage: &LinkageSpec,
) -> Result<Molecule, JoinError> {
    let (target_name, source_name) = linkage.primary_bond()?;
    let target_residue = junction::host_residue(&target, DeleteSide::Target)?;
    let source_residue = junction::host_residue(&source, DeleteSide::Source)?;
    let target_anchor =
        junction::resolve_anchor(&target, target_residue, target_name, DeleteSide::Target)?;
    let source_anchor =
        junction::resolve_anchor(&source, source_residue, source_name, DeleteSide::Source)?;
    junction::ensure_anchor_survives(&target, target_anchor, linkage, DeleteSide::Target)?;
    junction::ensure_anchor_survives(&source, source_anchor, linkage, DeleteSide::Source)?;

    let ideal = build_ideal_positions(&target, target_residue, linkage.internal_coordinates())?;

    // Pair every constructed source-side position with the atom's actual
    // position in the source fragment.
    let mut mobile = Vec::new();
    let mut landmarks = Vec::new();
    for (reference, position) in &ideal {
        let Some(name) = reference.strip_prefix('2') else {
            continue;
        };
        if let Some(atom_id) = source.find_atom(source_residue, name) {
            mobile.push(
                source
                    .atom(atom_id)
                    .map(|atom| atom.position)
                    .unwrap_or_default(),
            );
            landmarks.push(*position);
        }
    }
    if mobile.len() < MIN_REFERENCE_POINTS {
        return Err(JoinError::InsufficientReferencePoints {
            required: MIN_REFERENCE_POINTS,
            found: mobile.len(),
        });
    }
    debug!(reference_points = mobile.len(), "superposing onto ideal junction");
    let transform = geometry::superposition(&mobile, &landmarks)?;
    source.apply_transform(&transform);

    junction::remove_flagged_atoms(&mut target, target_residue, linkage, DeleteSide::Target);
    junction::remove_flagged_atoms(&mut source, source_residue, linkage, DeleteSide::Source);

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
    Ok(target)
}

/// Constructs ideal junction positions from the internal-coordinate table.
///
/// Target-side references (`'1'` prefix) seed the map with actual
/// coordinates; rows then place unknown atoms from known triples in either
/// direction until a pass makes no progress.
fn build_ideal_positions(
    target: &Molecule,
    target_residue: ResidueId,
    table: &[InternalCoordinate],
) -> Result<HashMap<String, Point3<f64>>, JoinError> {
    let mut ideal: HashMap<String, Point3<f64>> = HashMap::new();
    for ic in table {
        for reference in &ic.atoms {
            if ideal.contains_key(reference) {
                continue;
            }
            if let Some(name) = reference.strip_prefix('1') {
                if let Some(atom_id) = target.find_atom(target_residue, name) {
                    if let Some(atom) = target.atom(atom_id) {
                        ideal.insert(reference.clone(), atom.position);
                    }
                }
            }
        }
    }

    let mut placed = true;
    while placed {
        placed = false;
        for ic in table {
            let [a1, a2, a3, a4] = &ic.atoms;
            let known =
                |name: &String| -> Option<Point3<f64>> { ideal.get(name).copied() };
            match (known(a1), known(a2), known(a3), known(a4)) {
                (Some(p1), Some(p2), Some(p3), None) => {
                    let position = geometry::place_from_internal_coords(
                        &p1,
                        &p2,
                        &p3,
                        ic.bond_length_34,
                        ic.angle_234.to_radians(),
                        ic.dihedral.to_radians(),
                    )?;
                    ideal.insert(a4.clone(), position);
                    placed = true;
                }
                (None, Some(p2), Some(p3), Some(p4)) => {
                    // The dihedral reads the same from either end of the row.
                    let position = geometry::place_from_internal_coords(
                        &p4,
                        &p3,
                        &p2,
                        ic.bond_length_12,
                        ic.angle_123.to_radians(),
                        ic.dihedral.to_radians(),
                    )?;
                    ideal.insert(a1.clone(), position);
                    placed = true;
                }
                _ => {}
            }
        }
    }
    Ok(ideal)
}
