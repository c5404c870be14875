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

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use tidings::prelude::*;

use crate::setup::*;

mod setup;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn broadcast_delivers_once_with_the_published_data() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.new_hub("deliveries").unwrap_or_else(|e| e.into_existing());
    let (client, _peer) = connect(&hub, "c1").await?;
    let (handler, mut events) = event_probe();
    client.on_event("score", handler);

    for n in 0..3 {
        hub.broadcast("score", json!({ "points": n }), None).await;
    }
    for n in 0..3 {
        let event = next(&mut events).await;
        assert_eq!(event.kind(), "score");
        assert_eq!(event.data(), Some(&Payload::Json(json!({ "points": n }))));
    }
    assert_quiet(&mut events).await;
    assert_eq!(hub.stats().deliveries(), 3);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn hubs_are_isolated() -> anyhow::Result<()> {
    let registry = registry();
    let hub_a = registry.new_hub("a").unwrap_or_else(|e| e.into_existing());
    let hub_b = registry.new_hub("b").unwrap_or_else(|e| e.into_existing());
    let (in_b, _peer) = connect(&hub_b, "in-b").await?;
    let (handler, mut events) = event_probe();
    in_b.on_event("news", handler);

    let mut diagnostics = registry.diagnostics().subscribe();
    hub_a.broadcast("news", "only for a", None).await;
    assert_quiet(&mut events).await;
    expect_diagnostic(&mut diagnostics, TidingsError::NoSubscribers("news".into())).await;

    hub_b.broadcast("news", "for b", None).await;
    assert_eq!(next(&mut events).await.data().and_then(Payload::as_text), Some("for b"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ping_reports_recipient_source_and_data() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.default_hub();
    let (c1, _p1) = connect(&hub, "c1").await?;
    let (c2, _p2) = connect(&hub, "c2").await?;
    let (handler, mut events) = event_probe();
    c1.on_event("ping", handler);

    c2.trigger("ping", "payload").await;

    let event = next(&mut events).await;
    let recipient = event.recipient().expect("recipient is set before dispatch");
    assert_eq!(recipient.id(), "c1");
    assert_eq!(
        recipient.as_delegate().map(|d| d.member_key()),
        Some(c1.member_key())
    );
    let source = event.source().expect("triggered by a client");
    assert_eq!(source.delegate_id(), "c2");
    assert_eq!(event.data(), Some(&Payload::Text("payload".into())));
    Ok(())
}

#[tokio::test]
async fn duplicate_hub_id_hands_back_the_existing_hub() -> anyhow::Result<()> {
    let registry = registry();
    let first = registry.new_hub("lobby").unwrap_or_else(|e| e.into_existing());
    let err = registry.new_hub("lobby").expect_err("id is taken");
    assert_eq!(err.existing, first);
    assert_eq!(registry.hub("lobby"), Some(first));

    let as_error: TidingsError = err.into();
    assert_eq!(as_error, TidingsError::DuplicateHubId("lobby".into()));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dropped_agents_fall_out_of_the_routing_table() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.new_hub("pruning").unwrap_or_else(|e| e.into_existing());
    let agent = hub.new_event_agent();
    agent.subscribe("tick", EventHandler::from_fn(|_| {}));
    assert_eq!(hub.subscriber_count("tick"), 1);

    drop(agent);
    eventually("the queue is gone", || hub.subscriber_count("tick") == 0).await;
    hub.broadcast("tick", (), None).await;
    assert!(hub.kinds().is_empty());
    assert_eq!(hub.stats().unrouted(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handler_rebroadcasting_to_its_own_full_queue_drops_instead_of_blocking(
) -> anyhow::Result<()> {
    let registry = registry_with(|c| c.limits.queue_capacity = 1);
    let hub = registry.new_hub("reentrant").unwrap_or_else(|e| e.into_existing());
    let agent = hub.new_event_agent();
    let mut diagnostics = registry.diagnostics().subscribe();

    let calls = Arc::new(AtomicUsize::new(0));
    let fired = Arc::new(AtomicBool::new(false));
    let handler = {
        let hub = hub.clone();
        let calls = calls.clone();
        EventHandler::new(move |_| {
            let hub = hub.clone();
            let calls = calls.clone();
            let fired = fired.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if !fired.swap(true, Ordering::SeqCst) {
                    hub.broadcast("loop", (), None).await;
                    hub.broadcast("loop", (), None).await;
                }
            }
        })
    };
    agent.subscribe("loop", handler);

    hub.broadcast("loop", (), None).await;
    expect_diagnostic(&mut diagnostics, TidingsError::QueueFull("loop".into())).await;
    eventually("the queued event ran", || calls.load(Ordering::SeqCst) == 2).await;
    assert_eq!(hub.stats().dropped(), 1);
    Ok(())
}
