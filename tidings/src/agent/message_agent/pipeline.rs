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

//! The read and write tasks behind a [`MessageAgent`].

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::{interval_at, timeout, timeout_at, Instant, MissedTickBehavior};
use tracing::{debug, instrument, trace};

use super::{ConnectionState, ConnectionStatus, MessageAgent};
use crate::common::{AgentId, Diagnostics, TidingsError, TidingsResult};
use crate::transport::{ConnectionSettings, Frame, FrameSink, FrameSource, MessageType};

/// Receiving ends of the outbound queues.
pub(super) struct Outbound {
    pub(super) text: mpsc::Receiver<Bytes>,
    pub(super) binary: mpsc::Receiver<Bytes>,
}

impl Outbound {
    /// Closes both queues and discards whatever is still in them.
    fn close_and_drain(&mut self) -> usize {
        self.text.close();
        self.binary.close();
        let mut discarded = 0;
        while self.text.try_recv().is_ok() {
            discarded += 1;
        }
        while self.binary.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }
}

pub(super) fn spawn<Src, Snk>(
    agent: MessageAgent,
    source: Src,
    sink: Snk,
    outbound: Outbound,
    settings: ConnectionSettings,
) where
    Src: FrameSource,
    Snk: FrameSink,
{
    let status = agent.status();
    let diagnostics = agent.diagnostics().clone();
    let id = agent.id();
    tokio::spawn(read_loop(agent, source, settings));
    tokio::spawn(write_loop(id, status, diagnostics, sink, outbound, settings));
}

#[instrument(skip_all, fields(agent = %agent.id()))]
async fn read_loop<S: FrameSource>(
    agent: MessageAgent,
    mut source: S,
    settings: ConnectionSettings,
) {
    let status = agent.status();
    let mut deadline = Instant::now() + settings.pong_timeout;
    loop {
        let next = tokio::select! {
            () = status.shutdown.cancelled() => break,
            next = timeout_at(deadline, source.next_frame()) => next,
        };
        let frame = match next {
            Err(_) => {
                agent.diagnostics().error(TidingsError::ReadTimeout);
                break;
            }
            Ok(None) => {
                debug!("peer went away");
                break;
            }
            Ok(Some(Err(error))) => {
                agent.diagnostics().error(error);
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };
        match frame {
            Frame::Pong(_) => {
                trace!("pong");
                deadline = Instant::now() + settings.pong_timeout;
            }
            Frame::Ping(_) => trace!("ping from peer"),
            Frame::Close(reason) => {
                debug!(?reason, "peer closed the connection");
                break;
            }
            Frame::Text(raw) | Frame::Binary(raw) if raw.len() > settings.read_limit => {
                agent.diagnostics().error(TidingsError::ReadLimitExceeded {
                    size: raw.len(),
                    limit: settings.read_limit,
                });
                break;
            }
            Frame::Text(raw) => agent.receive(MessageType::Text, raw).await,
            Frame::Binary(raw) => agent.receive(MessageType::Binary, raw).await,
        }
    }
    if status.begin_close() {
        debug!("read side started teardown");
    }
}

async fn write<S: FrameSink>(sink: &mut S, frame: Frame, limit: Duration) -> TidingsResult<()> {
    timeout(limit, sink.send_frame(frame))
        .await
        .map_err(|_| TidingsError::WriteTimeout)?
}

#[instrument(skip(status, diagnostics, sink, outbound, settings))]
async fn write_loop<S: FrameSink>(
    agent: AgentId,
    status: Arc<ConnectionStatus>,
    diagnostics: Diagnostics,
    mut sink: S,
    mut outbound: Outbound,
    settings: ConnectionSettings,
) {
    let mut keepalive = interval_at(Instant::now() + settings.ping_period, settings.ping_period);
    keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        let frame = tokio::select! {
            () = status.shutdown.cancelled() => break,
            Some(text) = outbound.text.recv() => Frame::Text(text),
            Some(data) = outbound.binary.recv() => Frame::Binary(data),
            _ = keepalive.tick() => {
                trace!("ping");
                let ping = Frame::Ping(Bytes::new());
                if let Err(error) = write(&mut sink, ping, settings.write_timeout).await {
                    diagnostics.error(error);
                    break;
                }
                continue;
            }
        };
        if let Err(error) = write(&mut sink, frame, settings.write_timeout).await {
            diagnostics.error(error);
        }
    }

    status.begin_close();
    let discarded = outbound.close_and_drain();
    if discarded > 0 {
        debug!(discarded, "dropped queued frames on close");
    }
    let _ = write(&mut sink, Frame::Close(None), settings.write_timeout).await;
    let _ = timeout(settings.write_timeout, sink.close()).await;
    status.set(ConnectionState::Closed);
    debug!("connection closed");
}
