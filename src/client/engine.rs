//! The session engine - one task owning transport, reconnection, and state
//!
//! All mutation of the session view happens inside [`Engine::run`]'s select
//! loop, reacting to transport frames, caller commands, the one-second
//! elapsed-time tick, and the keepalive interval. The loop is the single
//! writer; everyone else observes snapshots through a watch channel.

use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;

use super::backoff::ReconnectPolicy;
use super::transport::{self, WsStream};
use super::{Command, Notice};
use crate::protocol::{self, ClientCommand, ControlKind, ServerEvent, MAX_CHAT_LEN};
use crate::session::{Applied, SessionState};

/// Why the open-connection phase returned.
#[derive(Debug, PartialEq, Eq)]
enum LoopExit {
    /// Caller asked for teardown; do not reconnect.
    Disconnect,
    /// The session reached its terminal status; do not reconnect.
    Ended,
    /// The transport dropped out from under us; schedule a retry.
    ConnectionLost,
}

enum SleepOutcome {
    Elapsed,
    Disconnected,
}

pub(crate) struct Engine {
    url: String,
    policy: ReconnectPolicy,
    keepalive: Duration,
    min_focus_interval: Duration,
    commands: mpsc::Receiver<Command>,
    state_tx: watch::Sender<SessionState>,
    notices: mpsc::Sender<Notice>,
    state: SessionState,
    last_focus_sent: Option<Instant>,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        url: String,
        policy: ReconnectPolicy,
        keepalive: Duration,
        min_focus_interval: Duration,
        commands: mpsc::Receiver<Command>,
        state_tx: watch::Sender<SessionState>,
        notices: mpsc::Sender<Notice>,
        state: SessionState,
    ) -> Self {
        Self {
            url,
            policy,
            keepalive,
            min_focus_interval,
            commands,
            state_tx,
            notices,
            state,
            last_focus_sent: None,
        }
    }

    /// Connection lifecycle loop: dial, drive, and on loss retry with
    /// exponential backoff until the caller disconnects, the session ends,
    /// or the attempt budget is spent.
    pub(crate) async fn run(mut self) {
        let mut failures: u32 = 0;

        loop {
            self.state.note_connecting(failures);
            self.publish();

            match transport::connect(&self.url).await {
                Ok(ws) => {
                    failures = 0;
                    self.state.note_open();
                    self.publish();
                    tracing::info!("connected to {}", self.url);

                    match self.drive(ws).await {
                        LoopExit::Disconnect => {
                            tracing::info!("disconnected by caller");
                            return;
                        }
                        LoopExit::Ended => {
                            tracing::info!("session ended, engine quiescing");
                            return;
                        }
                        LoopExit::ConnectionLost => {
                            tracing::warn!("connection lost");
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("connect attempt failed: {e:#}");
                }
            }

            failures += 1;
            if self.policy.exhausted(failures) {
                tracing::error!("giving up after {} failed attempts", failures);
                self.state.note_closed();
                self.publish();
                self.notify(Notice::ReconnectFailed);
                return;
            }

            let delay = self.policy.delay(failures - 1);
            self.state.note_reconnecting(failures);
            self.publish();
            self.notify(Notice::Reconnecting { attempt: failures });
            tracing::info!("retrying in {:?} (attempt {})", delay, failures);

            if let SleepOutcome::Disconnected = self.sleep_or_disconnect(delay).await {
                self.state.note_closed();
                self.publish();
                return;
            }
        }
    }

    /// Open-connection phase: dispatch frames, commands, and timers until
    /// something ends it.
    async fn drive(&mut self, ws: WsStream) -> LoopExit {
        let (mut sink, mut stream) = ws.split();

        // Resynchronize aggregates after every (re)connect.
        if self
            .send_frame(&mut sink, &ClientCommand::RequestStats)
            .await
            .is_err()
        {
            return LoopExit::ConnectionLost;
        }

        let second = Duration::from_secs(1);
        let mut tick = time::interval_at(Instant::now() + second, second);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut keepalive = time::interval_at(Instant::now() + self.keepalive, self.keepalive);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => match protocol::decode(&text) {
                        Ok(event) => {
                            if let Some(exit) = self.reduce(&event) {
                                let _ = sink.send(Message::Close(None)).await;
                                self.state.note_closed();
                                self.publish();
                                return exit;
                            }
                        }
                        Err(e) => tracing::warn!("dropping malformed envelope: {e:#}"),
                    },
                    Some(Ok(Message::Close(_))) | None => return LoopExit::ConnectionLost,
                    Some(Ok(_)) => {} // binary/ping/pong frames carry no protocol meaning
                    Some(Err(e)) => {
                        tracing::warn!("transport error: {e}");
                        return LoopExit::ConnectionLost;
                    }
                },

                cmd = self.commands.recv() => match cmd {
                    None | Some(Command::Disconnect) => {
                        self.state.note_closing();
                        self.publish();
                        let _ = sink.send(Message::Close(None)).await;
                        self.state.note_closed();
                        self.publish();
                        return LoopExit::Disconnect;
                    }
                    Some(cmd) => {
                        if let Some(out) = self.outbound(cmd) {
                            if self.send_frame(&mut sink, &out).await.is_err() {
                                return LoopExit::ConnectionLost;
                            }
                        }
                    }
                },

                _ = tick.tick() => {
                    if self.state.tick() {
                        self.publish();
                    }
                },

                _ = keepalive.tick() => {
                    if self.send_frame(&mut sink, &ClientCommand::Ping).await.is_err() {
                        return LoopExit::ConnectionLost;
                    }
                },
            }
        }
    }

    /// Apply one inbound event and translate its outcome into notices.
    fn reduce(&mut self, event: &ServerEvent) -> Option<LoopExit> {
        let applied = self.state.apply(event);
        self.publish();

        match applied {
            Applied::None => None,
            Applied::Established => {
                self.notify(Notice::Connected);
                None
            }
            Applied::LocalFocus(score) => {
                self.notify(Notice::LocalFocus { score });
                None
            }
            Applied::PeerError(message) => {
                tracing::warn!("server error: {message}");
                self.notify(Notice::ServerError { message });
                None
            }
            Applied::Ended => {
                self.notify(Notice::Ended);
                Some(LoopExit::Ended)
            }
        }
    }

    /// Validate and translate a caller command into a wire command.
    ///
    /// Returning `None` drops the command silently - the expected outcome
    /// for throttled focus updates and empty chat lines.
    fn outbound(&mut self, cmd: Command) -> Option<ClientCommand> {
        match cmd {
            Command::Focus(score) => {
                let now = Instant::now();
                if let Some(last) = self.last_focus_sent {
                    if now.duration_since(last) < self.min_focus_interval {
                        tracing::trace!("focus update throttled");
                        return None;
                    }
                }
                self.last_focus_sent = Some(now);
                Some(ClientCommand::FocusUpdate {
                    focus_score: score.clamp(0.0, 1.0),
                })
            }
            Command::Chat(text) => {
                let body = text.trim();
                if body.is_empty() {
                    return None;
                }
                if body.len() > MAX_CHAT_LEN {
                    tracing::warn!("chat message over {} bytes dropped", MAX_CHAT_LEN);
                    return None;
                }
                Some(ClientCommand::ChatMessage {
                    message: body.to_string(),
                })
            }
            Command::Control(ControlKind::Unknown) => None,
            Command::Control(kind) => Some(ClientCommand::SessionControl { control_type: kind }),
            Command::Leave => Some(ClientCommand::LeaveSession),
            Command::RequestStats => Some(ClientCommand::RequestStats),
            Command::Disconnect => None, // handled by the select loop
        }
    }

    async fn send_frame(
        &mut self,
        sink: &mut SplitSink<WsStream, Message>,
        cmd: &ClientCommand,
    ) -> Result<()> {
        let frame = match transport::command_frame(cmd) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("failed to encode command: {e:#}");
                return Ok(());
            }
        };
        sink.send(frame).await.context("websocket send failed")
    }

    /// Backoff sleep that a disconnect request cancels deterministically.
    /// Other commands arriving while disconnected are dropped, not queued.
    async fn sleep_or_disconnect(&mut self, delay: Duration) -> SleepOutcome {
        let sleep = time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return SleepOutcome::Elapsed,
                cmd = self.commands.recv() => match cmd {
                    None | Some(Command::Disconnect) => return SleepOutcome::Disconnected,
                    Some(cmd) => tracing::trace!("dropping {:?} while disconnected", cmd),
                },
            }
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }

    fn notify(&self, notice: Notice) {
        let _ = self.notices.try_send(notice);
    }
}
