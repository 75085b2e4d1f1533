pub mod authz;
pub mod rate_limit;
pub mod repository;
pub mod types;
