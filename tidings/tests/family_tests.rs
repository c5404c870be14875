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

use bytes::Bytes;
use tidings::prelude::*;

use crate::setup::*;

mod setup;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn joining_after_registration_inherits_the_handler() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.default_hub();
    let family = hub.new_family();
    let (handler, mut events) = event_probe();
    family.subscribe_event("x", handler.clone());

    let (c1, _p1) = connect(&hub, "c1").await?;
    let (c2, _p2) = connect(&hub, "c2").await?;
    c1.join(&[&family])?;
    assert!(c1.belongs_to(&family));
    assert!(!c2.belongs_to(&family));

    c2.trigger("x", ()).await;
    let event = next(&mut events).await;
    assert_eq!(event.recipient().map(Recipient::id).as_deref(), Some("c1"));
    assert_quiet(&mut events).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn join_order_does_not_change_the_outcome() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.default_hub();
    let (early, _p1) = connect(&hub, "early").await?;
    let (late, _p2) = connect(&hub, "late").await?;
    let family = hub.new_family();
    let handler = EventHandler::from_fn(|_| {});
    let on_message = MessageHandler::from_fn(|_| {});

    early.join(&[&family])?;
    family.subscribe_event("x", handler.clone());
    family.subscribe_message("chat", on_message.clone());
    late.join(&[&family])?;

    for member in [&early, &late] {
        assert!(member.event_agent().is_subscribed("x", &handler));
        assert!(member.message_agent().is_subscribed("chat", &on_message));
        assert_eq!(member.event_agent().kinds(), vec!["x".to_string()]);
    }
    assert_eq!(hub.subscriber_count("x"), 2);
    assert_eq!(family.member_ids(), vec!["early".to_string(), "late".to_string()]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn family_unsubscribe_reaches_every_member() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.default_hub();
    let family = hub.new_family();
    let (c1, _p1) = connect(&hub, "c1").await?;
    let (c2, _p2) = connect(&hub, "c2").await?;
    c1.join(&[&family])?;
    c2.join(&[&family])?;
    let (handler, mut events) = event_probe();
    family.subscribe_event("x", handler.clone());

    family.unsubscribe_event("x", &handler);
    assert!(!c1.event_agent().is_subscribed("x", &handler));
    assert!(!c2.event_agent().is_subscribed("x", &handler));
    assert_eq!(hub.subscriber_count("x"), 0);

    let mut diagnostics = registry.diagnostics().subscribe();
    hub.broadcast("x", (), None).await;
    expect_diagnostic(&mut diagnostics, TidingsError::NoSubscribers("x".into())).await;
    assert_quiet(&mut events).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn leaving_member_loses_family_handlers_and_keeps_its_own() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.default_hub();
    let family = hub.new_family();
    let (leaver, _p1) = connect(&hub, "leaver").await?;
    let (stayer, _p2) = connect(&hub, "stayer").await?;
    let (shared, mut shared_events) = event_probe();
    let (private, mut private_events) = event_probe();
    leaver.on_event("own", private);
    family.subscribe_event("x", shared.clone());
    leaver.join(&[&family])?;
    stayer.join(&[&family])?;

    leaver.leave(&family);
    assert!(!leaver.belongs_to(&family));
    assert!(!leaver.event_agent().is_subscribed("x", &shared));
    assert!(stayer.event_agent().is_subscribed("x", &shared));

    hub.broadcast("x", (), None).await;
    let event = next(&mut shared_events).await;
    assert_eq!(event.recipient().map(Recipient::id).as_deref(), Some("stayer"));
    assert_quiet(&mut shared_events).await;

    hub.broadcast("own", (), None).await;
    next(&mut private_events).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shared_handler_across_families_fires_once() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.default_hub();
    let red = hub.new_family();
    let blue = hub.new_family();
    let (client, _peer) = connect(&hub, "c1").await?;
    let (handler, mut events) = event_probe();
    red.subscribe_event("x", handler.clone());
    blue.subscribe_event("x", handler.clone());
    client.join(&[&red, &blue])?;

    hub.broadcast("x", (), None).await;
    next(&mut events).await;
    assert_quiet(&mut events).await;

    client.leave(&red);
    assert!(client.event_agent().is_subscribed("x", &handler));
    hub.broadcast("x", (), None).await;
    next(&mut events).await;

    client.leave(&blue);
    assert!(!client.event_agent().is_subscribed("x", &handler));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn membership_errors_are_warnings() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.default_hub();
    let family = hub.new_family();
    let (client, _peer) = connect(&hub, "c1").await?;
    let mut diagnostics = registry.diagnostics().subscribe();

    client.join(&[&family])?;
    client.join(&[&family])?;
    expect_diagnostic(&mut diagnostics, TidingsError::DuplicateDelegate).await;
    assert_eq!(family.len(), 1);

    client.leave(&family);
    client.leave(&family);
    expect_diagnostic(&mut diagnostics, TidingsError::NoDelegates).await;
    assert!(family.is_empty());

    let handler = EventHandler::from_fn(|_| {});
    family.subscribe_event("x", handler.clone());
    family.subscribe_event("x", handler);
    expect_diagnostic(&mut diagnostics, TidingsError::DuplicateHandler).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn joining_a_family_of_another_hub_fails() -> anyhow::Result<()> {
    let registry = registry();
    let home = registry.default_hub();
    let away = registry.new_hub("away").unwrap_or_else(|e| e.into_existing());
    let (client, _peer) = connect(&home, "c1").await?;
    let local = home.new_family();
    let foreign = away.new_family();

    let result = client.join(&[&foreign, &local]);
    assert_eq!(result, Err(TidingsError::HubMismatch));
    assert!(client.belongs_to(&local));
    assert!(!client.belongs_to(&foreign));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn family_messages_reach_every_member() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.default_hub();
    let family = hub.new_family();
    let (c1, mut p1) = connect(&hub, "c1").await?;
    let (c2, mut p2) = connect(&hub, "c2").await?;
    c1.join(&[&family])?;
    c2.join(&[&family])?;

    family.push_message("hello all", MessageType::Text).await?;
    for peer in [&mut p1, &mut p2] {
        let frame = tokio::time::timeout(PATIENCE, peer.recv_data()).await?;
        assert_eq!(frame, Some(Frame::Text(Bytes::from_static(b"hello all"))));
    }

    assert_eq!(
        family.push_message("nope", MessageType::Ping).await,
        Err(TidingsError::BadMessageType(9))
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn family_message_handlers_see_inbound_frames() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.default_hub();
    let family = hub.new_family();
    let (handler, mut messages) = message_probe();
    family.subscribe_message("chat", handler);
    let (client, peer) = connect(&hub, "c1").await?;
    client.join(&[&family])?;

    peer.send_text(r#"{"kind":"chat","text":"hi"}"#).await?;
    let message = next(&mut messages).await;
    assert_eq!(message.kind(), "chat");
    assert_eq!(message.recipient().id(), "c1");
    assert_eq!(message.source(), client.message_agent());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_listening_drops_own_handlers_and_keeps_family_ones() -> anyhow::Result<()> {
    let registry = registry();
    let hub = registry.default_hub();
    let family = hub.new_family();
    let (client, peer) = connect(&hub, "c1").await?;
    let (own, mut own_messages) = message_probe();
    let (shared, mut shared_messages) = message_probe();
    client.on_message("chat", own.clone());
    family.subscribe_message("chat", shared.clone());
    client.join(&[&family])?;

    client.stop_listening("chat");
    let agent = client.message_agent();
    assert!(!agent.is_subscribed("chat", &own));
    assert!(agent.is_subscribed("chat", &shared));

    peer.send_text(r#"{"kind":"chat"}"#).await?;
    next(&mut shared_messages).await;
    assert_quiet(&mut own_messages).await;

    client.leave(&family);
    assert!(agent.kinds().is_empty());
    Ok(())
}
