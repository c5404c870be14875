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

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{Sender, WeakSender};
use tracing::{instrument, trace};

use crate::agent::{dispatching_agent, EventAgent, MessageAgent};
use crate::common::registry::Shared;
use crate::common::{AgentId, Client, Diagnostics, Family, TidingsError, TidingsResult};
use crate::message::Event;
use crate::traits::{Delegate, EventData};
use crate::transport::{ConnectionSettings, Upgrade};

/// Broadcast counters for one hub.
#[derive(Debug, Default)]
pub struct HubStats {
    /// Total broadcasts.
    pub events_broadcast: AtomicUsize,
    /// Total events placed on an event queue.
    pub deliveries: AtomicUsize,
    /// Total events dropped because a dispatching queue was full.
    pub dropped: AtomicUsize,
    /// Total broadcasts that found no subscriber.
    pub unrouted: AtomicUsize,
}

impl HubStats {
    /// Get the number of broadcasts.
    #[must_use]
    pub fn events_broadcast(&self) -> usize {
        self.events_broadcast.load(Ordering::Relaxed)
    }

    /// Get the number of queued deliveries.
    #[must_use]
    pub fn deliveries(&self) -> usize {
        self.deliveries.load(Ordering::Relaxed)
    }

    /// Get the number of dropped events.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Get the number of broadcasts without subscribers.
    #[must_use]
    pub fn unrouted(&self) -> usize {
        self.unrouted.load(Ordering::Relaxed)
    }
}

type Routes = DashMap<String, HashMap<AgentId, WeakSender<Event>>>;

/// An isolated broadcast domain.
///
/// A hub maps each event kind to the queues of the event agents listening for
/// it. It holds those queues weakly, so an agent that goes away simply drops out
/// of the routing table. Events broadcast on one hub never reach another.
///
/// Cloning a `Hub` yields another handle to the same hub.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

struct HubInner {
    id: String,
    routes: Routes,
    shared: Arc<Shared>,
    stats: HubStats,
}

impl Hub {
    pub(crate) fn new(id: String, shared: Arc<Shared>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                id,
                routes: DashMap::new(),
                shared,
                stats: HubStats::default(),
            }),
        }
    }

    /// This hub's id.
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// The diagnostics stream shared with the rest of the registry.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.inner.shared.diagnostics
    }

    /// Broadcast counters.
    pub fn stats(&self) -> &HubStats {
        &self.inner.stats
    }

    pub(crate) fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings::from(&*self.inner.shared.config.read())
    }

    pub(crate) fn queue_capacity(&self) -> usize {
        self.inner.shared.config.read().limits.queue_capacity
    }

    /// Publishes an event of `kind` to every event agent listening for it.
    ///
    /// Waits while a target queue is full, except for the queue of the agent
    /// whose handler is making this call: that queue gets the event only if it
    /// has room, otherwise the event is dropped and a
    /// [`TidingsError::QueueFull`] warning is reported. A broadcast nobody listens
    /// to reports a [`TidingsError::NoSubscribers`] warning.
    #[instrument(skip(self, data, source), fields(hub = %self.inner.id))]
    pub async fn broadcast<D: EventData>(
        &self,
        kind: &str,
        data: D,
        source: Option<Arc<dyn Delegate>>,
    ) {
        let stats = &self.inner.stats;
        stats.events_broadcast.fetch_add(1, Ordering::Relaxed);
        let targets = self.targets(kind);
        if targets.is_empty() {
            stats.unrouted.fetch_add(1, Ordering::Relaxed);
            self.diagnostics()
                .warn(TidingsError::NoSubscribers(kind.to_string()));
            return;
        }

        let event = Event::new(kind, data.into_payload(), source);
        let dispatching = dispatching_agent();
        trace!(targets = targets.len(), "broadcasting");
        for (id, queue) in targets {
            if dispatching == Some(id) {
                match queue.try_send(event.clone()) {
                    Ok(()) => {
                        stats.deliveries.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(TrySendError::Full(_)) => {
                        stats.dropped.fetch_add(1, Ordering::Relaxed);
                        self.diagnostics()
                            .warn(TidingsError::QueueFull(kind.to_string()));
                    }
                    Err(TrySendError::Closed(_)) => {}
                }
            } else if queue.send(event.clone()).await.is_ok() {
                stats.deliveries.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Live queues routed for `kind`, pruning the dead ones.
    fn targets(&self, kind: &str) -> Vec<(AgentId, Sender<Event>)> {
        let mut targets = Vec::new();
        let emptied = match self.inner.routes.get_mut(kind) {
            Some(mut queues) => {
                queues.retain(|id, weak| match weak.upgrade() {
                    Some(queue) => {
                        targets.push((*id, queue));
                        true
                    }
                    None => false,
                });
                queues.is_empty()
            }
            None => false,
        };
        if emptied {
            self.inner.routes.remove_if(kind, |_, queues| queues.is_empty());
        }
        targets
    }

    pub(crate) fn subscribe(&self, kind: &str, agent: AgentId, queue: WeakSender<Event>) {
        trace!(hub = %self.inner.id, kind, %agent, "routing kind");
        self.inner
            .routes
            .entry(kind.to_string())
            .or_default()
            .insert(agent, queue);
    }

    pub(crate) fn unsubscribe(&self, kind: &str, agent: AgentId) {
        let emptied = match self.inner.routes.get_mut(kind) {
            Some(mut queues) => {
                queues.remove(&agent);
                queues.is_empty()
            }
            None => false,
        };
        if emptied {
            self.inner.routes.remove_if(kind, |_, queues| queues.is_empty());
        }
        trace!(hub = %self.inner.id, kind, %agent, "unrouted kind");
    }

    /// Number of live event queues routed for `kind`.
    pub fn subscriber_count(&self, kind: &str) -> usize {
        self.inner.routes.get(kind).map_or(0, |queues| {
            queues.values().filter(|weak| weak.upgrade().is_some()).count()
        })
    }

    /// Every kind with at least one routed queue, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.inner.routes.iter().map(|e| e.key().clone()).collect();
        kinds.sort();
        kinds
    }

    /// Upgrades a connection and wraps it in a client named `id`.
    ///
    /// # Errors
    ///
    /// Whatever the upgrade reports; see [`new_message_agent`](Self::new_message_agent).
    pub async fn new_client<U: Upgrade>(
        &self,
        id: impl Into<String>,
        upgrade: U,
    ) -> TidingsResult<Client> {
        Client::connect(self.clone(), id.into(), upgrade).await
    }

    /// Creates an empty family in this hub.
    pub fn new_family(&self) -> Family {
        Family::new(self.clone())
    }

    /// Creates a standalone event agent listening on this hub.
    pub fn new_event_agent(&self) -> EventAgent {
        EventAgent::new(self.clone())
    }

    /// Upgrades a connection and starts its pipeline.
    ///
    /// # Errors
    ///
    /// [`TidingsError::UpgradeFailed`] or [`TidingsError::HandshakeTimeout`] when
    /// the upgrade does not complete; no task is started in that case.
    pub async fn new_message_agent<U: Upgrade>(
        &self,
        upgrade: U,
    ) -> TidingsResult<MessageAgent> {
        MessageAgent::connect(self.clone(), upgrade).await
    }
}

impl PartialEq for Hub {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Hub {}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hub")
            .field("id", &self.inner.id)
            .field("kinds", &self.inner.routes.len())
            .field("stats", &self.inner.stats)
            .finish()
    }
}
