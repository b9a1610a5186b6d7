//! # Engine Module
//!
//! The stateful join machinery: everything between "two fragments and a
//! linkage" and "one merged molecule".
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Search parameters and rotatable-edge
//!   bounds for a join
//! - **Search Join** ([`stitch`]) - Landmark alignment, leaving-atom
//!   removal, junction conformer search, and merge
//! - **Geometric Join** ([`patch`]) - Internal-coordinate reconstruction of
//!   the junction, no conformer search
//! - **Optimizer Contract** ([`optimizer`]) - The narrow request/response
//!   interface the stitcher optimizes through, plus a grid-sweep
//!   implementation
//! - **Error Handling** ([`error`]) - The join error taxonomy

pub mod config;
pub mod error;
mod junction;
pub mod optimizer;
pub mod patch;
pub mod stitch;
