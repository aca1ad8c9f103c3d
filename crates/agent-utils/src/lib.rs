//! Shared utilities for agent-rs
//!
//! This crate provides common functionality used across the agent-rs workspace:
//! logging setup and JSON configuration file loading.

pub mod config;
pub mod logging;

pub use config::{ConfigError, load_json, load_json_optional, merge_json, resolve_env_string};
pub use logging::{init_tracing, init_tracing_with};
