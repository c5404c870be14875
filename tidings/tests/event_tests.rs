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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tidings::prelude::*;

use crate::setup::*;

mod setup;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn duplicate_registration_warns_and_delivers_once() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.default_hub();
    let (client, _peer) = connect(&hub, "c1").await?;
    let mut diagnostics = registry.diagnostics().subscribe();
    let (handler, mut events) = event_probe();

    client.on_event("ping", handler.clone());
    client.on_event("ping", handler.clone());
    expect_diagnostic(&mut diagnostics, TidingsError::DuplicateHandler).await;
    assert_eq!(client.event_agent().handler_count("ping"), 1);

    hub.broadcast("ping", (), None).await;
    next(&mut events).await;
    assert_quiet(&mut events).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handlers_run_in_registration_order() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.default_hub();
    let agent = hub.new_event_agent();
    let order = Arc::new(Mutex::new(Vec::new()));
    for n in 0..4 {
        let order = order.clone();
        agent.subscribe("step", EventHandler::from_fn(move |_| order.lock().push(n)));
    }

    hub.broadcast("step", (), None).await;
    eventually("every handler ran", || order.lock().len() == 4).await;
    assert_eq!(*order.lock(), vec![0, 1, 2, 3]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn standalone_agent_reports_itself_as_recipient() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.default_hub();
    let agent = hub.new_event_agent();
    let (handler, mut events) = event_probe();
    agent.subscribe("hello", handler);

    hub.broadcast("hello", (), None).await;
    let event = next(&mut events).await;
    match event.recipient() {
        Some(Recipient::EventAgent(recipient)) => assert_eq!(recipient, &agent),
        other => panic!("unexpected recipient {other:?}"),
    }
    assert!(event.source().is_none());
    assert!(event.data().is_none());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unsubscribing_one_kind_keeps_the_others_routed() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.default_hub();
    let agent = hub.new_event_agent();
    let (first, mut first_events) = event_probe();
    let (second, mut second_events) = event_probe();
    let (other, mut other_events) = event_probe();
    agent.subscribe("a", first.clone());
    agent.subscribe("a", second.clone());
    agent.subscribe("b", other.clone());

    agent.unsubscribe("a", &first);
    assert_eq!(hub.subscriber_count("a"), 1);
    hub.broadcast("a", (), None).await;
    next(&mut second_events).await;
    assert_quiet(&mut first_events).await;

    agent.unsubscribe("a", &second);
    assert_eq!(hub.kinds(), vec!["b".to_string()]);
    hub.broadcast("b", (), None).await;
    next(&mut other_events).await;

    agent.unsubscribe("a", &second);
    assert!(agent.is_listening());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn listener_stops_when_idle_and_restarts_on_demand() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.default_hub();
    let agent = hub.new_event_agent();
    let mut diagnostics = registry.diagnostics().subscribe();
    assert!(!agent.is_listening());

    let (handler, mut events) = event_probe();
    agent.subscribe("x", handler.clone());
    assert!(agent.is_listening());

    agent.unsubscribe("x", &handler);
    assert!(!agent.is_listening());
    expect_diagnostic(&mut diagnostics, TidingsError::EventChannelClosed).await;
    assert!(hub.kinds().is_empty());

    agent.subscribe("x", handler.clone());
    assert!(agent.is_listening());
    hub.broadcast("x", (), None).await;
    next(&mut events).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn restarted_listener_waits_for_the_previous_one() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.default_hub();
    let agent = hub.new_event_agent();
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicUsize::new(0));
    let slow = {
        let (running, peak, finished) = (running.clone(), peak.clone(), finished.clone());
        EventHandler::new(move |_| {
            let (running, peak, finished) = (running.clone(), peak.clone(), finished.clone());
            async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(300)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                finished.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    agent.subscribe("x", slow.clone());
    hub.broadcast("x", (), None).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    // Queued behind the running handler; the unsubscribe below makes it stale.
    hub.broadcast("x", (), None).await;

    agent.unsubscribe("x", &slow);
    agent.subscribe("x", slow.clone());
    hub.broadcast("x", (), None).await;

    eventually("both live events are handled", || {
        finished.load(Ordering::SeqCst) == 2
    })
    .await;
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(finished.load(Ordering::SeqCst), 2);
    assert_eq!(peak.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handlers_can_subscribe_from_inside_dispatch() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.default_hub();
    let agent = hub.new_event_agent();
    let (late, mut late_events) = event_probe();
    let recruiter = {
        let agent = agent.clone();
        EventHandler::from_fn(move |_| agent.subscribe("late", late.clone()))
    };
    agent.subscribe("recruit", recruiter);

    hub.broadcast("recruit", (), None).await;
    eventually("the late kind is routed", || hub.subscriber_count("late") == 1).await;
    hub.broadcast("late", (), None).await;
    assert_eq!(next(&mut late_events).await.kind(), "late");
    Ok(())
}
