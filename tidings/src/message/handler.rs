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
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::common::HandlerId;
use crate::message::{Event, Message};

type Callback<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync + 'static>;

/// A callback plus the identity it was given at construction.
///
/// Handler sets key entries by [`HandlerId`], never by the callback itself, so a
/// clone of a handler is the same handler while two handlers built from the same
/// closure are different.
pub struct Handler<T> {
    id: HandlerId,
    callback: Callback<T>,
}

/// A handler for hub events.
pub type EventHandler = Handler<Event>;

/// A handler for inbound connection messages.
pub type MessageHandler = Handler<Message>;

impl<T: Send + 'static> Handler<T> {
    /// Wraps an async callback.
    ///
    /// ```rust,ignore
    /// let handler = EventHandler::new(|event| async move {
    ///     tracing::info!(kind = event.kind());
    /// });
    /// ```
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            id: HandlerId::next(),
            callback: Arc::new(move |value: T| -> BoxFuture<'static, ()> {
                Box::pin(callback(value))
            }),
        }
    }

    /// Wraps a synchronous callback.
    pub fn from_fn<F>(callback: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self::new(move |value| {
            callback(value);
            futures::future::ready(())
        })
    }

    pub(crate) async fn call(&self, value: T) {
        (self.callback)(value).await;
    }
}

impl<T> Handler<T> {
    /// The identity used for de-duplication.
    pub fn id(&self) -> HandlerId {
        self.id
    }
}

impl<T> Clone for Handler<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Arc::clone(&self.callback),
        }
    }
}

impl<T> PartialEq for Handler<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Handler<T> {}

impl<T> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn clones_share_identity() {
        let handler: Handler<u8> = Handler::from_fn(|_| {});
        let other: Handler<u8> = Handler::from_fn(|_| {});
        assert_eq!(handler, handler.clone());
        assert_ne!(handler, other);
    }

    #[tokio::test]
    async fn call_runs_the_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        let handler: Handler<usize> = Handler::new(move |n| {
            let seen = seen.clone();
            async move {
                seen.fetch_add(n, Ordering::SeqCst);
            }
        });
        handler.call(3).await;
        handler.clone().call(4).await;
        assert_eq!(count.load(Ordering::SeqCst), 7);
    }
}
