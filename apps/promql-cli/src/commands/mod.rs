//! CLI command implementations

pub mod convert;
pub mod execute;
pub mod health;
pub mod metrics;
pub mod validate;
