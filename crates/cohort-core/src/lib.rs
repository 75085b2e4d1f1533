//! Cross-cutting HTTP plumbing shared by Cohort services.

pub mod envelope;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
