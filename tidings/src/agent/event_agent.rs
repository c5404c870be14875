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

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, trace};

use crate::agent::DISPATCHING;
use crate::common::subscriptions::{Registration, Removal, Subscriptions};
use crate::common::{AgentId, Diagnostics, HandlerId, Hub, TidingsError};
use crate::message::{Event, EventHandler, Recipient};
use crate::traits::Delegate;

/// Receives hub events and runs the handlers registered for their kinds.
///
/// The agent starts its dispatch task the first time a handler is registered and
/// stops it again once no kind has a handler left. A task started after such a
/// stop waits for its predecessor to drain before it dispatches anything, so
/// handlers for one agent never overlap. They run one after another, in
/// registration order; a handler that never finishes stalls every later event
/// for the agent.
///
/// Cloning an `EventAgent` yields another handle to the same agent.
#[derive(Clone)]
pub struct EventAgent {
    inner: Arc<Inner>,
}

struct Inner {
    id: AgentId,
    hub: Hub,
    delegate: RwLock<Option<Weak<dyn Delegate>>>,
    state: Mutex<ListenerState>,
}

#[derive(Default)]
struct ListenerState {
    subscriptions: Subscriptions<Event>,
    queue: Option<mpsc::Sender<Event>>,
    task: Option<JoinHandle<()>>,
    generation: u64,
}

impl EventAgent {
    pub(crate) fn new(hub: Hub) -> Self {
        let agent = Self {
            inner: Arc::new(Inner {
                id: AgentId::next(),
                hub,
                delegate: RwLock::new(None),
                state: Mutex::new(ListenerState::default()),
            }),
        };
        trace!(agent = %agent.id(), hub = agent.hub().id(), "event agent created");
        agent
    }

    /// This agent's identity.
    pub fn id(&self) -> AgentId {
        self.inner.id
    }

    /// The hub this agent listens on.
    pub fn hub(&self) -> &Hub {
        &self.inner.hub
    }

    /// Reports `delegate` as the recipient of every event from now on.
    ///
    /// The agent keeps only a weak reference; once the delegate is dropped the
    /// agent reports itself again.
    pub fn set_delegate(&self, delegate: &Arc<dyn Delegate>) {
        self.set_delegate_weak(Arc::downgrade(delegate));
    }

    pub(crate) fn set_delegate_weak(&self, delegate: Weak<dyn Delegate>) {
        *self.inner.delegate.write() = Some(delegate);
    }

    /// The delegate, if one is set and still alive.
    pub fn delegate(&self) -> Option<Arc<dyn Delegate>> {
        self.inner.delegate.read().as_ref().and_then(Weak::upgrade)
    }

    fn recipient(&self) -> Recipient {
        match self.delegate() {
            Some(delegate) => Recipient::Delegate(delegate),
            None => Recipient::EventAgent(self.clone()),
        }
    }

    /// `true` while the dispatch task is running.
    pub fn is_listening(&self) -> bool {
        self.inner.state.lock().queue.is_some()
    }

    /// Registers `handler` for events of `kind`.
    ///
    /// Starts the dispatch task if it is not running and asks the hub to route
    /// `kind` to this agent. Registering the same handler twice for one kind
    /// reports a [`TidingsError::DuplicateHandler`] warning and changes nothing.
    ///
    /// # Panics
    ///
    /// When the dispatch task has to be started outside a Tokio runtime.
    pub fn subscribe(&self, kind: &str, handler: EventHandler) {
        if self.add(kind, handler, false) == Registration::Duplicate {
            self.diagnostics().warn(TidingsError::DuplicateHandler);
        }
    }

    /// Removes `handler` from `kind`. Unknown handlers are ignored.
    ///
    /// The hub stops routing `kind` here once no handler for it remains, and the
    /// dispatch task stops once no kind remains.
    pub fn unsubscribe(&self, kind: &str, handler: &EventHandler) {
        self.remove(kind, handler.id(), false);
    }

    pub(crate) fn hold(&self, kind: &str, handler: EventHandler) {
        self.add(kind, handler, true);
    }

    pub(crate) fn release(&self, kind: &str, id: HandlerId) {
        self.remove(kind, id, true);
    }

    /// `true` if `handler` is registered for `kind`.
    pub fn is_subscribed(&self, kind: &str, handler: &EventHandler) -> bool {
        self.inner.state.lock().subscriptions.contains(kind, handler.id())
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: &str) -> usize {
        self.inner.state.lock().subscriptions.handler_count(kind)
    }

    /// Every kind with at least one handler, sorted.
    pub fn kinds(&self) -> Vec<String> {
        self.inner.state.lock().subscriptions.kinds()
    }

    fn diagnostics(&self) -> &Diagnostics {
        self.inner.hub.diagnostics()
    }

    fn add(&self, kind: &str, handler: EventHandler, held: bool) -> Registration {
        let mut state = self.inner.state.lock();
        let registration = if held {
            state.subscriptions.hold(kind, handler)
        } else {
            state.subscriptions.subscribe(kind, handler)
        };
        if let Registration::Added { new_kind: true } = registration {
            let queue = match &state.queue {
                Some(queue) => queue.clone(),
                None => self.listen(&mut state),
            };
            self.inner.hub.subscribe(kind, self.id(), queue.downgrade());
        }
        registration
    }

    fn remove(&self, kind: &str, id: HandlerId, held: bool) {
        let mut state = self.inner.state.lock();
        let removal = if held {
            state.subscriptions.release(kind, id)
        } else {
            state.subscriptions.unsubscribe(kind, id)
        };
        if let Removal::Removed { kind_empty: true } = removal {
            self.inner.hub.unsubscribe(kind, self.id());
            if state.subscriptions.is_empty() {
                debug!(agent = %self.id(), "no kinds left, closing event queue");
                state.queue = None;
            }
        }
    }

    fn listen(&self, state: &mut ListenerState) -> mpsc::Sender<Event> {
        let (queue, events) = mpsc::channel(self.inner.hub.queue_capacity());
        state.generation += 1;
        let inbox = Inbox {
            events,
            generation: state.generation,
        };
        let owner = Arc::downgrade(&self.inner);
        let diagnostics = self.diagnostics().clone();
        let previous = state.task.take();
        state.task = Some(tokio::spawn(dispatch(
            self.id(),
            owner,
            inbox,
            diagnostics,
            previous,
        )));
        state.queue = Some(queue.clone());
        queue
    }
}

/// The receiving end of one listening period.
struct Inbox {
    events: mpsc::Receiver<Event>,
    generation: u64,
}

/// Drains the event queue until every sender is gone.
///
/// Waits for `previous`, the agent's last dispatch task, before reading. Events
/// still queued once a newer listening period has begun are discarded.
#[instrument(skip(owner, inbox, diagnostics, previous))]
async fn dispatch(
    id: AgentId,
    owner: Weak<Inner>,
    mut inbox: Inbox,
    diagnostics: Diagnostics,
    previous: Option<JoinHandle<()>>,
) {
    if let Some(previous) = previous {
        trace!("waiting for the previous dispatch task");
        let _ = previous.await;
    }
    trace!("dispatch started");
    while let Some(event) = inbox.events.recv().await {
        let Some(inner) = owner.upgrade() else {
            break;
        };
        let agent = EventAgent { inner };
        let handlers = {
            let state = agent.inner.state.lock();
            if state.generation != inbox.generation {
                debug!(kind = event.kind(), "discarding event from a stopped listener");
                continue;
            }
            state.subscriptions.handlers(event.kind())
        };
        trace!(kind = event.kind(), handlers = handlers.len(), "dispatching event");
        let event = event.with_recipient(agent.recipient());
        drop(agent);
        DISPATCHING
            .scope(id, async move {
                for handler in handlers {
                    handler.call(event.clone()).await;
                }
            })
            .await;
    }
    diagnostics.warn(TidingsError::EventChannelClosed);
}

impl PartialEq for EventAgent {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for EventAgent {}

impl fmt::Debug for EventAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventAgent")
            .field("id", &self.inner.id)
            .field("hub", &self.inner.hub.id())
            .finish_non_exhaustive()
    }
}
