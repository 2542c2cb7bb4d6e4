//! Shared utilities for stock-insight
//!
//! This crate provides common functionality used across the workspace,
//! including logging setup and environment lookup helpers.

pub mod config;
pub mod logging;

pub use config::{EnvError, env_flag, env_or, env_parse};
pub use logging::{init_tracing, init_tracing_json};
