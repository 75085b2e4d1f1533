//! Token types shared by the Cohort API and its test helpers.
//!
//! Provides JWT issuing/validation for every token kind and bearer-header parsing.

pub mod bearer;
pub mod token;
