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

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::common::{Diagnostics, DuplicateHubId, Hub, TidingsConfig, TidingsResult};

/// Configuration and diagnostics shared by every hub of a registry.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) config: RwLock<TidingsConfig>,
    pub(crate) diagnostics: Diagnostics,
}

/// Owns every hub of a process, the default hub among them.
///
/// Cheap to clone; clones share the same hubs.
#[derive(Debug, Clone)]
pub struct HubRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug)]
struct RegistryInner {
    shared: Arc<Shared>,
    hubs: DashMap<String, Hub>,
    default_hub: OnceLock<Hub>,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl HubRegistry {
    pub(crate) fn from_config(config: TidingsConfig) -> Self {
        let diagnostics = Diagnostics::new(config.limits.diagnostics_capacity);
        Self {
            inner: Arc::new(RegistryInner {
                shared: Arc::new(Shared {
                    config: RwLock::new(config),
                    diagnostics,
                }),
                hubs: DashMap::new(),
                default_hub: OnceLock::new(),
            }),
        }
    }

    /// Creates and registers a hub under `id`.
    ///
    /// # Errors
    ///
    /// [`DuplicateHubId`] when `id` is taken. The error carries the hub already
    /// registered under `id` so the caller can carry on with it.
    pub fn new_hub(&self, id: impl Into<String>) -> Result<Hub, DuplicateHubId> {
        use dashmap::mapref::entry::Entry;

        let id = id.into();
        match self.inner.hubs.entry(id.clone()) {
            Entry::Occupied(existing) => {
                debug!(hub = %id, "hub id already registered");
                Err(DuplicateHubId {
                    id,
                    existing: existing.get().clone(),
                })
            }
            Entry::Vacant(slot) => {
                let hub = Hub::new(id, self.inner.shared.clone());
                trace!(hub = hub.id(), "hub created");
                slot.insert(hub.clone());
                Ok(hub)
            }
        }
    }

    /// The default hub, created on first use under `defaults.default_hub_id`.
    ///
    /// If a hub with that id was already created through
    /// [`new_hub`](Self::new_hub), that hub becomes the default.
    pub fn default_hub(&self) -> Hub {
        self.inner
            .default_hub
            .get_or_init(|| {
                let id = self.inner.shared.config.read().defaults.default_hub_id.clone();
                self.new_hub(id).unwrap_or_else(DuplicateHubId::into_existing)
            })
            .clone()
    }

    /// Looks up a hub by id.
    pub fn hub(&self, id: &str) -> Option<Hub> {
        self.inner.hubs.get(id).map(|hub| hub.value().clone())
    }

    /// Ids of every registered hub, sorted.
    pub fn hub_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.hubs.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    /// Unregisters a hub and returns it.
    ///
    /// Existing handles keep working; the id becomes free for
    /// [`new_hub`](Self::new_hub). The cached default hub is not affected.
    pub fn remove_hub(&self, id: &str) -> Option<Hub> {
        let removed = self.inner.hubs.remove(id).map(|(_, hub)| hub);
        if removed.is_some() {
            debug!(hub = id, "hub removed");
        }
        removed
    }

    /// The stream of warnings and errors raised by background work.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.inner.shared.diagnostics
    }

    /// A snapshot of the current configuration.
    pub fn config(&self) -> TidingsConfig {
        self.inner.shared.config.read().clone()
    }

    fn update(&self, change: impl FnOnce(&mut TidingsConfig)) -> TidingsResult<()> {
        let mut config = self.inner.shared.config.write();
        let mut candidate = config.clone();
        change(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }

    /// Sets the keepalive ping period for connections opened from now on.
    ///
    /// # Errors
    ///
    /// [`TidingsError::IllegalPingTimeout`](crate::common::TidingsError::IllegalPingTimeout)
    /// unless `period` is shorter than the pong timeout. Nothing changes on error.
    pub fn set_ping_period(&self, period: Duration) -> TidingsResult<()> {
        self.update(|c| c.timeouts.ping_period_ms = millis(period))
    }

    /// Sets the pong timeout for connections opened from now on.
    ///
    /// # Errors
    ///
    /// [`TidingsError::IllegalPingTimeout`](crate::common::TidingsError::IllegalPingTimeout)
    /// unless `timeout` is longer than the ping period. Nothing changes on error.
    pub fn set_pong_timeout(&self, timeout: Duration) -> TidingsResult<()> {
        self.update(|c| c.timeouts.pong_timeout_ms = millis(timeout))
    }

    /// Sets both keepalive values at once.
    ///
    /// # Errors
    ///
    /// [`TidingsError::IllegalPingTimeout`](crate::common::TidingsError::IllegalPingTimeout)
    /// unless `ping_period` is shorter than `pong_timeout`. Nothing changes on error.
    pub fn set_keepalive(
        &self,
        ping_period: Duration,
        pong_timeout: Duration,
    ) -> TidingsResult<()> {
        self.update(|c| {
            c.timeouts.ping_period_ms = millis(ping_period);
            c.timeouts.pong_timeout_ms = millis(pong_timeout);
        })
    }

    /// Sets the per-write deadline.
    ///
    /// # Errors
    ///
    /// [`TidingsError::InvalidConfig`](crate::common::TidingsError::InvalidConfig) for zero.
    pub fn set_write_timeout(&self, timeout: Duration) -> TidingsResult<()> {
        self.update(|c| c.timeouts.write_timeout_ms = millis(timeout))
    }

    /// Sets the upgrade deadline.
    ///
    /// # Errors
    ///
    /// [`TidingsError::InvalidConfig`](crate::common::TidingsError::InvalidConfig) for zero.
    pub fn set_handshake_timeout(&self, timeout: Duration) -> TidingsResult<()> {
        self.update(|c| c.timeouts.handshake_timeout_ms = millis(timeout))
    }

    /// Sets the largest accepted inbound frame, in bytes.
    ///
    /// # Errors
    ///
    /// [`TidingsError::InvalidConfig`](crate::common::TidingsError::InvalidConfig) for zero.
    pub fn set_read_limit(&self, limit: usize) -> TidingsResult<()> {
        self.update(|c| c.limits.read_limit = limit)
    }

    /// Sets the transport buffer sizes; 0 keeps the transport default.
    ///
    /// # Errors
    ///
    /// Never fails today; kept fallible like the other setters.
    pub fn set_buffer_sizes(&self, read: usize, write: usize) -> TidingsResult<()> {
        self.update(|c| {
            c.limits.read_buffer_size = read;
            c.limits.write_buffer_size = write;
        })
    }
}
