//! # molstitch
//!
//! A library for assembling multi-residue molecules from molecular fragments,
//! built around an explicit atom-level connectivity graph and geometric
//! fragment joining.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to keep
//! data, algorithms, and user-facing procedures apart:
//!
//! - **[`core`]: The Foundation.** Stateless data models ([`core::models::molecule::Molecule`],
//!   residues, atoms, bonds), the connectivity graph with its traversal and
//!   rotatable-edge queries, pure geometry routines (superposition, axis
//!   rotation, internal-coordinate placement), and linkage templates.
//!
//! - **[`engine`]: The Logic Core.** This stateful layer performs the actual
//!   joins: the search-based stitcher that superposes, prunes, and hands the
//!   rotatable bonds of the junction to a conformer optimizer, and the purely
//!   geometric patcher that rebuilds junction atoms from internal-coordinate
//!   tables.
//!
//! - **[`workflows`]: The Public API.** The highest-level entry points that
//!   dispatch a [`core::linkage::LinkageSpec`] to the right engine and cover
//!   the common assembly patterns such as chain polymerization.

pub mod core;
pub mod engine;
pub mod workflows;
