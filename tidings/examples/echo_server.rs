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

//! Echo Server Example
//!
//! A tiny chat room over WebSocket. Every connection joins one family. A
//! `{"kind":"say","text":"..."}` frame from any member is rebroadcast as a
//! `said` event, and every member relays that event back to its peer.
//!
//! # Running This Example
//!
//! ```bash
//! cargo run --example echo_server --features ws
//! ```
//!
//! Then connect with any WebSocket client, e.g. `websocat ws://127.0.0.1:9001`.

use std::time::Duration;

use serde_json::json;
use tidings::prelude::*;
use tidings::transport::ws::WsUpgrade;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const ADDR: &str = "127.0.0.1:9001";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tidings=debug".parse()?))
        .init();

    let registry = TidingsApp::launch();
    let hub = registry.default_hub();
    let room = hub.new_family();

    room.subscribe_message(
        "say",
        MessageHandler::new(|message: Message| async move {
            let text = message
                .data()
                .as_json()
                .and_then(|v| v.get("text"))
                .cloned()
                .unwrap_or_default();
            let from = message.recipient().id();
            let speaker = message.recipient().as_delegate().cloned();
            message
                .source()
                .hub()
                .broadcast("said", json!({ "from": from, "text": text }), speaker)
                .await;
        }),
    );
    room.subscribe_event(
        "said",
        EventHandler::new(|event: Event| async move {
            let (Some(member), Some(data)) = (
                event.recipient().and_then(Recipient::as_delegate),
                event.data().and_then(Payload::as_json),
            ) else {
                return;
            };
            let _ = member.message_agent().push_text(data.to_string()).await;
        }),
    );

    let mut diagnostics = registry.diagnostics().subscribe();
    tokio::spawn(async move {
        while let Ok(diagnostic) = diagnostics.recv().await {
            if !diagnostic.is_warning() {
                warn!(%diagnostic, "connection problem");
            }
        }
    });

    let listener = TcpListener::bind(ADDR).await?;
    info!("listening on ws://{ADDR}");
    loop {
        let (stream, addr) = listener.accept().await?;
        let hub = hub.clone();
        let room = room.clone();
        tokio::spawn(async move {
            let client = match hub.new_client(addr.to_string(), WsUpgrade::new(stream)).await {
                Ok(client) => client,
                Err(e) => {
                    warn!(%addr, error = %e, "handshake failed");
                    return;
                }
            };
            if let Err(e) = client.join(&[&room]) {
                warn!(%addr, error = %e, "could not join the room");
                return;
            }
            info!(%addr, "joined");
            while client.state() != ConnectionState::Closed {
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            client.leave(&room);
            info!(%addr, "left");
        });
    }
}
