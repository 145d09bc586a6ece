//! Configuration module
//!
//! Endpoint, credential and pagination settings, loaded from TOML
//! with environment overrides.

pub mod config;

pub use config::Config;
