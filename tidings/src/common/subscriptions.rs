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

//! Kind-keyed handler sets shared by agents and families.

use std::collections::HashMap;

use crate::common::HandlerId;
use crate::message::Handler;

/// Outcome of adding a handler to a [`Subscriptions`] map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Registration {
    /// The handler is new for this kind. `new_kind` is set when the kind had no handlers before.
    Added { new_kind: bool },
    /// The handler was already registered under this kind.
    Duplicate,
}

/// Outcome of removing a handler from a [`Subscriptions`] map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Removal {
    /// The handler is gone. `kind_empty` is set when the kind has no handlers left.
    Removed { kind_empty: bool },
    /// A hold was released but others still keep the handler registered.
    Retained,
    /// The handler was not registered under this kind.
    Missing,
}

struct Entry<T> {
    handler: Handler<T>,
    direct: bool,
    holds: usize,
}

impl<T> Entry<T> {
    fn is_unused(&self) -> bool {
        !self.direct && self.holds == 0
    }
}

/// Handlers for one kind, in registration order, at most one per [`HandlerId`].
pub(crate) struct HandlerSet<T> {
    entries: Vec<Entry<T>>,
}

impl<T> Default for HandlerSet<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> HandlerSet<T> {
    fn position(&self, id: HandlerId) -> Option<usize> {
        self.entries.iter().position(|e| e.handler.id() == id)
    }

    fn contains(&self, id: HandlerId) -> bool {
        self.position(id).is_some()
    }

    fn insert(&mut self, handler: Handler<T>) -> bool {
        if self.contains(handler.id()) {
            return false;
        }
        self.entries.push(Entry {
            handler,
            direct: true,
            holds: 0,
        });
        true
    }

    fn hold(&mut self, handler: Handler<T>) -> bool {
        match self.position(handler.id()) {
            Some(index) => {
                self.entries[index].holds += 1;
                false
            }
            None => {
                self.entries.push(Entry {
                    handler,
                    direct: false,
                    holds: 1,
                });
                true
            }
        }
    }

    fn remove(&mut self, id: HandlerId) -> bool {
        match self.position(id) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    fn release(&mut self, id: HandlerId) -> Option<bool> {
        let index = self.position(id)?;
        let entry = &mut self.entries[index];
        entry.holds = entry.holds.saturating_sub(1);
        if entry.is_unused() {
            self.entries.remove(index);
            Some(true)
        } else {
            Some(false)
        }
    }

    /// Drops every direct registration, keeping handlers that are still held.
    fn clear_direct(&mut self) -> usize {
        let before = self.entries.len();
        for entry in &mut self.entries {
            entry.direct = false;
        }
        self.entries.retain(|e| !e.is_unused());
        before - self.entries.len()
    }

    fn handlers(&self) -> Vec<Handler<T>> {
        self.entries.iter().map(|e| e.handler.clone()).collect()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Maps each kind to its [`HandlerSet`].
///
/// Direct registrations go through [`subscribe`](Self::subscribe) and
/// [`unsubscribe`](Self::unsubscribe). Family cascades use the counted
/// [`hold`](Self::hold) and [`release`](Self::release), so a handler granted by two
/// families stays registered until both let go of it.
pub(crate) struct Subscriptions<T> {
    kinds: HashMap<String, HandlerSet<T>>,
}

impl<T> Default for Subscriptions<T> {
    fn default() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }
}

impl<T> Subscriptions<T> {
    pub(crate) fn subscribe(&mut self, kind: &str, handler: Handler<T>) -> Registration {
        let new_kind = !self.kinds.contains_key(kind);
        if self.kinds.entry(kind.to_string()).or_default().insert(handler) {
            Registration::Added { new_kind }
        } else {
            Registration::Duplicate
        }
    }

    pub(crate) fn hold(&mut self, kind: &str, handler: Handler<T>) -> Registration {
        let new_kind = !self.kinds.contains_key(kind);
        if self.kinds.entry(kind.to_string()).or_default().hold(handler) {
            Registration::Added { new_kind }
        } else {
            Registration::Duplicate
        }
    }

    pub(crate) fn unsubscribe(&mut self, kind: &str, id: HandlerId) -> Removal {
        let Some(set) = self.kinds.get_mut(kind) else {
            return Removal::Missing;
        };
        if !set.remove(id) {
            return Removal::Missing;
        }
        Removal::Removed {
            kind_empty: self.prune(kind),
        }
    }

    pub(crate) fn release(&mut self, kind: &str, id: HandlerId) -> Removal {
        let Some(set) = self.kinds.get_mut(kind) else {
            return Removal::Missing;
        };
        match set.release(id) {
            None => Removal::Missing,
            Some(false) => Removal::Retained,
            Some(true) => Removal::Removed {
                kind_empty: self.prune(kind),
            },
        }
    }

    /// Removes every direct registration for `kind`. Handlers granted through
    /// [`hold`](Self::hold) stay until they are released.
    pub(crate) fn clear_direct(&mut self, kind: &str) -> Removal {
        let Some(set) = self.kinds.get_mut(kind) else {
            return Removal::Missing;
        };
        if set.clear_direct() == 0 {
            return Removal::Retained;
        }
        Removal::Removed {
            kind_empty: self.prune(kind),
        }
    }

    fn prune(&mut self, kind: &str) -> bool {
        let empty = self.kinds.get(kind).map_or(true, HandlerSet::is_empty);
        if empty {
            self.kinds.remove(kind);
        }
        empty
    }

    /// Snapshot of the handlers for `kind`, in registration order.
    pub(crate) fn handlers(&self, kind: &str) -> Vec<Handler<T>> {
        self.kinds.get(kind).map(HandlerSet::handlers).unwrap_or_default()
    }

    /// Snapshot of every `(kind, handler)` pair.
    pub(crate) fn entries(&self) -> Vec<(String, Handler<T>)> {
        self.kinds
            .iter()
            .flat_map(|(kind, set)| {
                set.handlers()
                    .into_iter()
                    .map(move |handler| (kind.clone(), handler))
            })
            .collect()
    }

    pub(crate) fn contains(&self, kind: &str, id: HandlerId) -> bool {
        self.kinds.get(kind).is_some_and(|set| set.contains(id))
    }

    pub(crate) fn handler_count(&self, kind: &str) -> usize {
        self.kinds.get(kind).map_or(0, HandlerSet::len)
    }

    pub(crate) fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.kinds.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
