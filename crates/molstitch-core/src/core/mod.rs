//! # Core Module
//!
//! Fundamental building blocks for fragment assembly: molecular data models,
//! the connectivity graph, geometry routines, and linkage templates.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, residues, bonds, and
//!   the [`models::molecule::Molecule`] container that keeps them consistent
//! - **Connectivity** ([`graph`]) - The undirected atom graph with
//!   neighborhood queries, cycle detection, and rotatable-edge discovery
//! - **Geometry** ([`geometry`]) - Rigid superposition, rotation about a
//!   line, and internal-coordinate placement
//! - **Join Recipes** ([`linkage`]) - Declarative descriptions of how two
//!   fragments connect, and ([`templates`]) their TOML-backed libraries

pub mod geometry;
pub mod graph;
pub mod linkage;
pub mod models;
pub mod templates;
