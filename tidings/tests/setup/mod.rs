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
#![allow(dead_code)]

use std::sync::Once;
use std::time::Duration;

use tidings::prelude::*;
use tidings::transport::channel::{self, Peer};
use tokio::sync::{broadcast, mpsc};
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

// Ensures tracing initialization happens only once across all tests.
static INIT: Once = Once::new();

/// How long a test waits for something that should happen.
pub const PATIENCE: Duration = Duration::from_secs(2);

/// How long a test waits to be sure something does not happen.
pub const QUIET: Duration = Duration::from_millis(150);

/// Initializes the global tracing subscriber for tests.
///
/// Logs go to `logs/tidings_tests.txt` so test output stays readable. Uses
/// `std::sync::Once` so every test can call it.
pub fn initialize_tracing() {
    INIT.call_once(|| {
        std::fs::create_dir_all("logs").expect("could not create logs dir");

        let file_appender =
            RollingFileAppender::new(Rotation::NEVER, "logs", "tidings_tests.txt");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // Leak the guard so the non-blocking writer is not dropped before process exit
        Box::leak(Box::new(guard));

        let filter = EnvFilter::new("trace")
            .add_directive("tidings=trace".parse().unwrap())
            .add_directive(
                "tidings::agent::message_agent::pipeline=trace"
                    .parse()
                    .unwrap(),
            )
            .add_directive("tokio=info".parse().unwrap());

        let subscriber = FmtSubscriber::builder()
            .with_span_events(FmtSpan::NONE)
            .with_max_level(Level::TRACE)
            .compact()
            .with_line_number(true)
            .without_time()
            .with_target(true)
            .with_env_filter(filter)
            .with_writer(non_blocking)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("setting default subscriber failed");
    });
}

/// A registry with the default configuration.
pub fn registry() -> HubRegistry {
    registry_with(|_| {})
}

/// A registry with a tweaked default configuration.
pub fn registry_with(tweak: impl FnOnce(&mut TidingsConfig)) -> HubRegistry {
    initialize_tracing();
    let mut config = TidingsConfig::default();
    tweak(&mut config);
    TidingsApp::with_config(config).expect("test configuration must be valid")
}

/// Connects a client over the in-memory transport.
pub async fn connect(hub: &Hub, id: &str) -> anyhow::Result<(Client, Peer)> {
    let (upgrade, peer) = channel::pair();
    let client = hub.new_client(id, upgrade).await?;
    Ok((client, peer))
}

/// An event handler that forwards every event it sees.
pub fn event_probe() -> (EventHandler, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = EventHandler::from_fn(move |event| {
        let _ = tx.send(event);
    });
    (handler, rx)
}

/// A message handler that forwards every message it sees.
pub fn message_probe() -> (MessageHandler, mpsc::UnboundedReceiver<Message>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handler = MessageHandler::from_fn(move |message| {
        let _ = tx.send(message);
    });
    (handler, rx)
}

/// Waits for the next item, failing the test after [`PATIENCE`].
pub async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(PATIENCE, rx.recv())
        .await
        .expect("timed out waiting for a delivery")
        .expect("probe channel closed")
}

/// Asserts that nothing arrives within [`QUIET`].
pub async fn assert_quiet<T: std::fmt::Debug>(rx: &mut mpsc::UnboundedReceiver<T>) {
    if let Ok(Some(item)) = tokio::time::timeout(QUIET, rx.recv()).await {
        panic!("unexpected delivery: {item:?}");
    }
}

/// Waits for a diagnostic carrying `error`, skipping any others.
pub async fn expect_diagnostic(
    rx: &mut broadcast::Receiver<Diagnostic>,
    error: TidingsError,
) -> Diagnostic {
    tokio::time::timeout(PATIENCE, async {
        loop {
            match rx.recv().await {
                Ok(diagnostic) if diagnostic.error == error => return diagnostic,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("diagnostics closed"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {error}"))
}

/// Asserts that no diagnostic matching `predicate` arrives within [`QUIET`].
pub async fn assert_no_diagnostic(
    rx: &mut broadcast::Receiver<Diagnostic>,
    predicate: impl Fn(&TidingsError) -> bool,
) {
    let _ = tokio::time::timeout(QUIET, async {
        loop {
            match rx.recv().await {
                Ok(diagnostic) if predicate(&diagnostic.error) => {
                    panic!("unexpected diagnostic: {diagnostic}")
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    })
    .await;
}

/// Polls `condition` until it holds, failing the test after [`PATIENCE`].
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    let waited = tokio::time::timeout(PATIENCE, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting until {what}");
}
