// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the registry throttle.
//!
//! Values can be supplied through serde (e.g. a config file) or read from the
//! environment with [`Config::from_env`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Admission gate configuration
    #[serde(default)]
    pub throttle: ThrottleConfig,

    /// Registry endpoint configuration
    #[serde(default)]
    pub registry: RegistryConfig,
}

/// Sliding-window limits for outgoing submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    /// Maximum admissions within one window (default: 10)
    #[serde(default = "default_capacity")]
    pub capacity: u32,

    /// Window length in milliseconds (default: 1000)
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
}

/// Where and how submissions are sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Registry base URL (default: https://ismp.crpt.ru)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Units a window of exactly one unit can be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowUnit {
    Second,
    Minute,
    Hour,
    Day,
}

impl WindowUnit {
    /// Length of one unit.
    pub fn duration(self) -> Duration {
        match self {
            Self::Second => Duration::from_secs(1),
            Self::Minute => Duration::from_secs(60),
            Self::Hour => Duration::from_secs(60 * 60),
            Self::Day => Duration::from_secs(24 * 60 * 60),
        }
    }
}

// Default value functions
fn default_capacity() -> u32 {
    10
}

fn default_window_ms() -> u64 {
    1000
}

fn default_base_url() -> String {
    "https://ismp.crpt.ru".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            throttle: ThrottleConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            window_ms: default_window_ms(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ThrottleConfig {
    /// Get the window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl RegistryConfig {
    /// Get the request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// - `THROTTLE_CAPACITY`: admissions per window (default: 10)
    /// - `THROTTLE_WINDOW_MS`: window length in milliseconds (default: 1000)
    /// - `REGISTRY_BASE_URL`: registry base URL
    /// - `REGISTRY_TIMEOUT_SECS`: request timeout (default: 30)
    ///
    /// Unset or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Config {
            throttle: ThrottleConfig {
                capacity: lookup("THROTTLE_CAPACITY")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_capacity),
                window_ms: lookup("THROTTLE_WINDOW_MS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_window_ms),
            },
            registry: RegistryConfig {
                base_url: lookup("REGISTRY_BASE_URL").unwrap_or_else(default_base_url),
                timeout_secs: lookup("REGISTRY_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or_else(default_timeout_secs),
            },
        }
    }
}
