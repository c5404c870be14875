/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::common::types::DEFAULT_QUEUE_CAPACITY;
use crate::common::{TidingsError, TidingsResult};

/// Configuration for the Tidings broker.
///
/// Loaded from `$XDG_CONFIG_HOME/tidings/config.toml`. Every section and field is
/// optional in the file; anything missing falls back to the defaults below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TidingsConfig {
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Limits and capacity configuration
    pub limits: LimitsConfig,
    /// Default values configuration
    pub defaults: DefaultsConfig,
}

/// Timeout-related configuration values, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for a single outbound write, pings included
    pub write_timeout_ms: u64,
    /// Deadline for the connection upgrade
    pub handshake_timeout_ms: u64,
    /// How long to wait for a pong before the connection counts as dead
    pub pong_timeout_ms: u64,
    /// Interval between keepalive pings; must be shorter than `pong_timeout_ms`
    pub ping_period_ms: u64,
}

/// Limits and capacity configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest inbound frame accepted, in bytes
    pub read_limit: usize,
    /// Transport read buffer size; 0 keeps the transport default
    pub read_buffer_size: usize,
    /// Transport write buffer size; 0 keeps the transport default
    pub write_buffer_size: usize,
    /// Capacity of every event queue and outbound frame queue
    pub queue_capacity: usize,
    /// How many diagnostics a slow listener may lag behind
    pub diagnostics_capacity: usize,
}

/// Default configuration values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Id under which the default hub is registered
    pub default_hub_id: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            write_timeout_ms: 10_000,
            handshake_timeout_ms: 10_000,
            pong_timeout_ms: 60_000,
            ping_period_ms: 54_000,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            read_limit: 4096,
            read_buffer_size: 0,
            write_buffer_size: 0,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            diagnostics_capacity: 256,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            default_hub_id: "tidings:DefaultHub".to_string(),
        }
    }
}

impl TidingsConfig {
    /// Per-write deadline as a `Duration`
    pub const fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.write_timeout_ms)
    }

    /// Upgrade deadline as a `Duration`
    pub const fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.handshake_timeout_ms)
    }

    /// Pong timeout as a `Duration`
    pub const fn pong_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.pong_timeout_ms)
    }

    /// Ping period as a `Duration`
    pub const fn ping_period(&self) -> Duration {
        Duration::from_millis(self.timeouts.ping_period_ms)
    }

    /// Checks that the values can drive a connection.
    ///
    /// # Errors
    ///
    /// [`TidingsError::IllegalPingTimeout`] when the ping period is not strictly
    /// shorter than the pong timeout, [`TidingsError::InvalidConfig`] for zero
    /// timeouts, a zero read limit or a zero queue capacity.
    pub fn validate(&self) -> TidingsResult<()> {
        let t = &self.timeouts;
        if t.write_timeout_ms == 0 || t.handshake_timeout_ms == 0 || t.ping_period_ms == 0 {
            return Err(TidingsError::InvalidConfig(
                "timeouts must be greater than zero".into(),
            ));
        }
        if t.ping_period_ms >= t.pong_timeout_ms {
            return Err(TidingsError::IllegalPingTimeout);
        }
        if self.limits.read_limit == 0 {
            return Err(TidingsError::InvalidConfig(
                "read_limit must be greater than zero".into(),
            ));
        }
        if self.limits.queue_capacity == 0 || self.limits.diagnostics_capacity == 0 {
            return Err(TidingsError::InvalidConfig(
                "capacities must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`TidingsError::InvalidConfig`] when the document is malformed, or whatever
    /// [`validate`](Self::validate) reports.
    pub fn from_toml(source: &str) -> TidingsResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| TidingsError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates the file at `path`.
    ///
    /// # Errors
    ///
    /// [`TidingsError::InvalidConfig`] when the file cannot be read, plus anything
    /// [`from_toml`](Self::from_toml) reports.
    pub fn from_file(path: &Path) -> TidingsResult<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| TidingsError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml(&source)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `tidings/config.toml` under `$XDG_CONFIG_HOME` (falling back to
    /// `~/.config`). A missing file yields the defaults. An unreadable, malformed
    /// or invalid file is logged and the defaults are used.
    pub fn load() -> Self {
        let xdg_dirs = match xdg::BaseDirectories::with_prefix("tidings") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        let Some(path) = xdg_dirs.find_config_file("config.toml") else {
            info!("No configuration file found, using defaults");
            return Self::default();
        };

        info!("Loading configuration from: {}", path.display());
        match Self::from_file(&path) {
            Ok(config) => {
                info!("Successfully loaded configuration");
                config
            }
            Err(e) => {
                error!("Failed to load configuration file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
