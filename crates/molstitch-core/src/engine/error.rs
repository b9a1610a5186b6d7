use thiserror::Error;

use super::optimizer::OptimizerError;
use crate::core::geometry::GeometryError;
use crate::core::graph::connectivity::GraphError;
use crate::core::linkage::{DeleteSide, LinkageError};
use crate::core::models::molecule::StructureError;

/// Errors raised while joining two fragments.
///
/// Input errors (missing anchors, malformed linkages) fail before any
/// fragment is mutated. Once deletion has begun a failure is final; callers
/// that need atomicity should go through the preview API instead.
#[derive(Debug, Error)]
pub enum JoinError {
    #[error("No anchor atom '{name}' on the {side} fragment and no usable default")]
    MissingAnchor { side: DeleteSide, name: String },

    #[error("The {side} fragment has no residue to join at")]
    MissingResidue { side: DeleteSide },

    #[error("No flagged leaving atom is bonded to anchor '{anchor}' on the {side} fragment")]
    NoLeavingNeighbor { side: DeleteSide, anchor: String },

    #[error("Anchor atom '{name}' on the {side} fragment is itself flagged for deletion")]
    AnchorFlaggedForDeletion { side: DeleteSide, name: String },

    #[error("A geometric join requires at least {required} placeable junction atoms, got {found}")]
    InsufficientReferencePoints { required: usize, found: usize },

    #[error("Cannot polymerize zero repeat units")]
    ZeroRepeatUnits,

    #[error(transparent)]
    Linkage(#[from] LinkageError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("Conformer optimization failed: {source}")]
    Optimizer {
        #[from]
        source: OptimizerError,
    },
}
