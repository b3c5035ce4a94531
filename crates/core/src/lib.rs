//! Domain core for the weave snippet-graph service.
//!
//! Pure types and logic only: identifiers, the domain error taxonomy,
//! input validation, generation policy, and the model catalog. No I/O
//! happens in this crate.

pub mod catalog;
pub mod error;
pub mod generation;
pub mod roles;
pub mod types;
pub mod validation;
