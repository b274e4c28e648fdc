//! CLI command implementations.

pub mod demo;
pub mod forget;
pub mod status;
