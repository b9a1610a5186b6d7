//! Atom-level connectivity as an explicit, queryable graph.

pub mod connectivity;
