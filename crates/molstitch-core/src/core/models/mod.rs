//! # Core Models Module
//!
//! Data structures for representing molecular fragments.
//!
//! - [`atom`] - Individual atom with element, name, serial, and coordinates
//! - [`residue`] - Named, numbered atom grouping with by-name lookup
//! - [`molecule`] - The fragment container tying atoms, residues, bonds, and
//!   the connectivity graph together
//! - [`topology`] - Bond records and bond orders
//! - [`element`] - Covalent and contact radii per element
//! - [`ids`] - Generational key types for atoms and residues

pub mod atom;
pub mod element;
pub mod ids;
pub mod molecule;
pub mod residue;
pub mod topology;
