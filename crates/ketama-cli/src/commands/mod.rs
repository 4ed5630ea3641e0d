//! CLI command implementations.

pub mod distribution;
pub mod init;
pub mod points;
pub mod route;
