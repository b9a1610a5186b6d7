//! # Workflows Module
//!
//! The user-facing assembly procedures: strategy dispatch over a linkage,
//! preview joins, and chain polymerization.

pub mod attach;
