//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the route
//! compiler and its preview server. All types derive Serde traits for
//! deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Where route files live and how they are recognized.
    pub routes: RoutesConfig,

    /// Artifact generation settings.
    pub build: BuildConfig,

    /// Preview server settings.
    pub server: ServerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Routes tree settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Routes root directory.
    pub root: PathBuf,

    /// File extensions (without the dot) that declare routes.
    pub extensions: Vec<String>,

    /// Top-level directory holding API routes.
    pub api_dir: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("routes"),
            extensions: vec!["rs".to_string()],
            api_dir: "api".to_string(),
        }
    }
}

/// Build output settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Directory that receives the generated artifacts.
    pub out_dir: PathBuf,

    /// Collapse single-child static chains.
    pub compress: bool,

    /// Also write the generated Rust module.
    pub emit_rust: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("target/routes"),
            compress: true,
            emit_rust: true,
        }
    }
}

/// Preview server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:3000").
    pub bind_address: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
