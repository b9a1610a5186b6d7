use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;

use nalgebra::Point3;
use thiserror::Error;
use tracing::debug;

use super::config::JoinConfig;
use crate::core::graph::connectivity::NeighborMode;
use crate::core::models::element;
use crate::core::models::ids::AtomId;
use crate::core::models::molecule::{Molecule, StructureError};

const SCORE_EPSILON: f64 = 1e-12;

#[derive(Debug, Error)]
pub enum OptimizerError {
    #[error("Expected {expected} rotation angles, the optimizer produced {found}")]
    AngleCountMismatch { expected: usize, found: usize },

    #[error("Conformer search failed: {source}")]
    Search {
        #[from]
        source: StructureError,
    },
}

/// A conformer search over the junction between two freshly joined residues.
///
/// The structure is the temporary sub-structure limited to those two
/// residues plus the new bond; rotating its edges never touches the rest of
/// either fragment.
pub struct OptimizationRequest<'a> {
    pub structure: &'a Molecule,
    /// Rotatable edges in application order, each oriented away from the
    /// join root so that a rotation moves the edge's descendants.
    pub edges: &'a [(AtomId, AtomId)],
}

/// The narrow contract the join engine optimizes through. Implementations
/// return exactly one angle (radians) per requested edge; the engine applies
/// them and never guesses on a length mismatch.
pub trait RotationOptimizer {
    fn optimize(&self, request: OptimizationRequest<'_>) -> Result<Vec<f64>, OptimizerError>;
}

/// A deterministic per-edge grid sweep minimizing a pairwise contact-overlap
/// clash score. Edges are swept in request order; each sweep keeps the best
/// angle before moving on, so the result is a local clash-relief pass, not a
/// global search.
#[derive(Debug, Clone)]
pub struct GridSearchOptimizer {
    pub steps: usize,
    pub contact_scale: f64,
}

impl Default for GridSearchOptimizer {
    fn default() -> Self {
        let defaults = JoinConfig::default();
        Self {
            steps: defaults.grid_steps,
            contact_scale: defaults.contact_scale,
        }
    }
}

impl GridSearchOptimizer {
    pub fn from_config(config: &JoinConfig) -> Self {
        Self {
            steps: config.grid_steps,
            contact_scale: config.contact_scale,
        }
    }
}

impl RotationOptimizer for GridSearchOptimizer {
    fn optimize(&self, request: OptimizationRequest<'_>) -> Result<Vec<f64>, OptimizerError> {
        let mut work = request.structure.clone();
        let exclusions = exclusion_map(&work)?;

        let mut angles = Vec::with_capacity(request.edges.len());
        for &(a, b) in request.edges {
            let mut best_angle = 0.0;
            let mut best_score = clash_score(&work, &HashMap::new(), &exclusions, self.contact_scale);
            for step in 1..self.steps {
                let angle = step as f64 * TAU / self.steps as f64;
                let moved: HashMap<AtomId, Point3<f64>> = work
                    .preview_rotation(a, b, angle, true)?
                    .into_iter()
                    .collect();
                let score = clash_score(&work, &moved, &exclusions, self.contact_scale);
                if score + SCORE_EPSILON < best_score {
                    best_angle = angle;
                    best_score = score;
                }
            }
            if best_angle != 0.0 {
                work.rotate_around_edge(a, b, best_angle, true)?;
            }
            debug!(angle = best_angle, score = best_score, "swept one junction edge");
            angles.push(best_angle);
        }
        Ok(angles)
    }
}

/// Applies a preset angle list, e.g. to reproduce a previously optimized
/// junction. The list length must match the edge count exactly.
#[derive(Debug, Clone, Default)]
pub struct FixedAngleOptimizer {
    pub angles: Vec<f64>,
}

impl RotationOptimizer for FixedAngleOptimizer {
    fn optimize(&self, request: OptimizationRequest<'_>) -> Result<Vec<f64>, OptimizerError> {
        if self.angles.len() != request.edges.len() {
            return Err(OptimizerError::AngleCountMismatch {
                expected: request.edges.len(),
                found: self.angles.len(),
            });
        }
        Ok(self.angles.clone())
    }
}

/// Atom pairs separated by one or two bonds are bonded context, not clashes.
fn exclusion_map(
    molecule: &Molecule,
) -> Result<HashMap<AtomId, HashSet<AtomId>>, StructureError> {
    let mut map = HashMap::with_capacity(molecule.atom_count());
    for (atom_id, _) in molecule.atoms_iter() {
        let near = molecule
            .graph()
            .neighbors_within(atom_id, 2, NeighborMode::Upto)
            .map_err(StructureError::Graph)?;
        map.insert(atom_id, near);
    }
    Ok(map)
}

/// Sum of squared contact-sphere overlaps over all non-excluded atom pairs,
/// with positions optionally overridden by a previewed rotation.
fn clash_score(
    molecule: &Molecule,
    moved: &HashMap<AtomId, Point3<f64>>,
    exclusions: &HashMap<AtomId, HashSet<AtomId>>,
    contact_scale: f64,
) -> f64 {
    let atoms: Vec<_> = molecule.atoms_iter().collect();
    let mut score = 0.0;
    for i in 0..atoms.len() {
        let (id_i, atom_i) = atoms[i];
        let position_i = moved.get(&id_i).copied().unwrap_or(atom_i.position);
        let radius_i = element::contact_radius(&atom_i.element);
        for &(id_j, atom_j) in &atoms[i + 1..] {
            if exclusions[&id_i].contains(&id_j) {
                continue;
            }
            let position_j = moved.get(&id_j).copied().unwrap_or(atom_j.position);
            let cutoff = contact_scale * (radius_i + element::contact_radius(&atom_j.element));
            let distance = (position_i - position_j).norm();
            if distance < cutoff {
                let overlap = cutoff - distance;
                score += overlap * overlap;
            }
        }
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::ids::ResidueId;
    use crate::core::models::topology::BondOrder;
    use nalgebra::Point3;

    /// A chain T-A1-A2-B1-B2 where the substituents T and B2 clash until
    /// B2 is rotated out of the shared plane.
    fn clashing_chain() -> (Molecule, (AtomId, AtomId), (AtomId, AtomId)) {
        let mut mol = Molecule::new("clash");
        let res = mol.add_residue(1, "CLH");
        let add = |mol: &mut Molecule, name: &str, x: f64, y: f64| {
            mol.add_atom(
                res,
                Atom::new(name, "C", ResidueId::default(), Point3::new(x, y, 0.0)),
            )
            .unwrap()
        };
        let a1 = add(&mut mol, "A1", 0.0, 0.0);
        let a2 = add(&mut mol, "A2", 1.2, 0.0);
        let b1 = add(&mut mol, "B1", 2.4, 0.0);
        let b2 = add(&mut mol, "B2", 2.4, 1.4);
        let t = add(&mut mol, "T", 0.0, 1.4);
        mol.add_bond(a1, a2, BondOrder::Single).unwrap();
        mol.add_bond(a2, b1, BondOrder::Single).unwrap();
        mol.add_bond(b1, b2, BondOrder::Single).unwrap();
        mol.add_bond(a1, t, BondOrder::Single).unwrap();
        (mol, (a2, b1), (t, b2))
    }

    #[test]
    fn grid_search_relieves_a_clash_and_is_deterministic() {
        let (mol, edge, (t, b2)) = clashing_chain();
        let edges = vec![edge];
        let optimizer = GridSearchOptimizer::default();

        let initial_gap = (mol.atom(t).unwrap().position - mol.atom(b2).unwrap().position).norm();
        assert!(initial_gap < optimizer.contact_scale * 2.0 * element::contact_radius("C"));

        let request = OptimizationRequest {
            structure: &mol,
            edges: &edges,
        };
        let angles = optimizer.optimize(request).unwrap();
        assert_eq!(angles.len(), 1);
        assert!(angles[0] != 0.0, "the clash should force a rotation");

        let again = optimizer
            .optimize(OptimizationRequest {
                structure: &mol,
                edges: &edges,
            })
            .unwrap();
        assert_eq!(angles, again);

        // Applying the returned angle must actually separate the pair.
        let mut resolved = mol.clone();
        resolved
            .rotate_around_edge(edge.0, edge.1, angles[0], true)
            .unwrap();
        let final_gap = (resolved.atom(t).unwrap().position
            - resolved.atom(b2).unwrap().position)
            .norm();
        assert!(final_gap > initial_gap);
    }

    #[test]
    fn zero_edges_yield_an_empty_angle_list() {
        let (mol, _, _) = clashing_chain();
        let angles = GridSearchOptimizer::default()
            .optimize(OptimizationRequest {
                structure: &mol,
                edges: &[],
            })
            .unwrap();
        assert!(angles.is_empty());
    }

    #[test]
    fn fixed_angles_must_match_the_edge_count() {
        let (mol, edge, _) = clashing_chain();
        let edges = vec![edge];
        let optimizer = FixedAngleOptimizer {
            angles: vec![0.5, 1.0],
        };
        let error = optimizer
            .optimize(OptimizationRequest {
                structure: &mol,
                edges: &edges,
            })
            .unwrap_err();
        assert!(matches!(
            error,
            OptimizerError::AngleCountMismatch {
                expected: 1,
                found: 2
            }
        ));
    }
}
