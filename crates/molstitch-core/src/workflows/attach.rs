use tracing::info;

use crate::core::linkage::{JoinStrategy, LinkageSpec};
use crate::core::models::molecule::Molecule;
use crate::engine::config::JoinConfig;
use crate::engine::error::JoinError;
use crate::engine::optimizer::RotationOptimizer;
use crate::engine::{patch, stitch::Stitcher};

/// Joins `source` onto `target`, consuming both fragments and dispatching
/// on the linkage's join strategy: a geometric linkage goes through the
/// internal-coordinate patcher, a search linkage through the stitcher.
pub fn attach(
    target: Molecule,
    source: Molecule,
    linkage: &LinkageSpec,
    config: &JoinConfig,
    optimizer: &dyn RotationOptimizer,
) -> Result<Molecule, JoinError> {
    info!(
        target_id = %target.id,
        source_id = %source.id,
        strategy = ?linkage.strategy(),
        "attaching fragment"
    );
    match linkage.strategy() {
        JoinStrategy::Geometric => patch::join(target, source, linkage),
        JoinStrategy::Search => Stitcher::new(config, optimizer).join(target, source, linkage),
    }
}

/// Non-consuming counterpart of [`attach`]: both fragments are cloned
/// internally and a new molecule is always returned, so the inputs survive
/// a failed join untouched.
pub fn attach_preview(
    target: &Molecule,
    source: &Molecule,
    linkage: &LinkageSpec,
    config: &JoinConfig,
    optimizer: &dyn RotationOptimizer,
) -> Result<Molecule, JoinError> {
    attach(target.clone(), source.clone(), linkage, config, optimizer)
}

/// Builds a chain of `count` copies of `unit`, joined head-to-tail with the
/// same linkage. A zero-length chain is an input error.
pub fn polymerize(
    unit: &Molecule,
    count: usize,
    linkage: &LinkageSpec,
    config: &JoinConfig,
    optimizer: &dyn RotationOptimizer,
) -> Result<Molecule, JoinError> {
    if count == 0 {
        return Err(JoinError::ZeroRepeatUnits);
    }
    info!(unit_id = %unit.id, count, "polymerizing");
    let mut product = unit.clone();
    for _ in 1..count {
        product = attach(product, unit.clone(), linkage, config, optimizer)?;
    }
    Ok(product)
}
