//! Domain types shared across Cohort crates.
//!
//! This crate contains only pure types with no framework dependencies.

pub mod pagination;
pub mod role;
pub mod validate;
