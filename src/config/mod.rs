//! Configuration module for the backcache console.
//!
//! Loads configuration from environment variables.

use std::env;

use crate::cache::{DEFAULT_NAMESPACE, StorageType};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Storage mode for the console's cache instance.
    pub storage_type: StorageType,

    /// Namespace used by commands that don't name one.
    pub default_namespace: String,

    /// Print every `cache.response` notification.
    pub echo_responses: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Shared,
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            echo_responses: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables (and `.env`, if present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// Nothing here is required; bad values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage_type = lookup("CACHE_STORAGE_TYPE")
            .map(|s| StorageType::parse_lossy(&s))
            .unwrap_or_default();

        let default_namespace = lookup("CACHE_DEFAULT_NAMESPACE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

        let echo_responses = match lookup("CACHE_ECHO_RESPONSES")
            .unwrap_or_default()
            .trim()
            .to_lowercase()
            .as_str()
        {
            "0" | "false" | "no" | "off" => false,
            _ => true,
        };

        Self {
            storage_type,
            default_namespace,
            echo_responses,
        }
    }
}
