//! Line-delimited JSON event stream.
//!
//! Every line is one [`PlatformEvent`]:
//!
//! ```text
//! {"type":"guild_snapshot","guild_id":"1","members":[{"user_id":"42","status":"online"}],"voice_states":[]}
//! {"type":"ready"}
//! {"type":"presence_update","guild_id":"1","user_id":"42","status":"idle"}
//! {"type":"voice_state_update","guild_id":"1","user_id":"42","channel_id":"7","previous_channel_id":null}
//! ```
//!
//! The stream comes either from our stdin or from the stdout of a bridge
//! command that holds the platform session.

use super::{HandlerSet, PlatformEvent, RosterCache};
use crate::error::BridgeError;
use crate::presence::WatchContext;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Where platform events are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSource {
    Stdin,
    /// Whitespace-separated command line, supervised and restarted on exit.
    Command(String),
}

impl EventSource {
    pub fn from_bridge(bridge: Option<String>) -> Self {
        bridge.map_or(Self::Stdin, Self::Command)
    }
}

/// Decode one line. Blank lines yield `None`.
pub fn decode(line: &str) -> Result<Option<PlatformEvent>, BridgeError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

/// Feeds decoded events into the roster cache and the handlers.
///
/// `ready` seeds the watcher from the cache. Presence and voice records seen
/// before the first `ready` only update the cache; the seed picks them up.
pub struct EventPump {
    ctx: Arc<WatchContext>,
    cache: Arc<RosterCache>,
    handlers: HandlerSet,
    bootstraps: AtomicUsize,
}

impl EventPump {
    pub fn new(ctx: Arc<WatchContext>, cache: Arc<RosterCache>, handlers: HandlerSet) -> Self {
        Self {
            ctx,
            cache,
            handlers,
            bootstraps: AtomicUsize::new(0),
        }
    }

    /// How many `ready` records have been handled.
    pub fn bootstraps(&self) -> usize {
        self.bootstraps.load(Ordering::SeqCst)
    }

    pub async fn handle_event(&self, event: PlatformEvent) {
        self.cache.apply(&event);

        match event {
            PlatformEvent::GuildSnapshot(snapshot) => {
                tracing::debug!(
                    guild = %snapshot.guild_id,
                    members = snapshot.members.len(),
                    "guild snapshot received"
                );
            }
            PlatformEvent::Ready => {
                let count = self.bootstraps.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::info!(session = count, "Platform session ready");
                self.ctx.bootstrap(self.cache.as_ref());
            }
            PlatformEvent::PresenceUpdate(update) => {
                if self.bootstraps() == 0 {
                    self.ctx
                        .quiet_log()
                        .debug("Presence update before ready; cached only");
                    return;
                }
                self.handlers.dispatch_presence(update).await;
            }
            PlatformEvent::VoiceStateUpdate(update) => {
                if self.bootstraps() == 0 {
                    self.ctx
                        .quiet_log()
                        .debug("Voice update before ready; cached only");
                    return;
                }
                self.handlers.dispatch_voice(update).await;
            }
        }
    }

    /// Read records until EOF. Malformed records are logged and skipped;
    /// only a read failure ends the stream early.
    pub async fn consume<R>(&self, reader: R) -> Result<(), BridgeError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            match decode(&line) {
                Ok(Some(event)) => self.handle_event(event).await,
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping bridge record: {e}"),
            }
        }
        Ok(())
    }

    /// Run `command` with the token in its environment and consume its
    /// stdout. Always ends in an error, because the bridge is expected to
    /// run for as long as we do.
    pub async fn run_command(&self, command: &str, token: &str) -> Result<(), BridgeError> {
        let parts: Vec<&str> = command.split_whitespace().collect();
        let Some((program, args)) = parts.split_first() else {
            return Err(BridgeError::Exited("bridge command is empty".into()));
        };

        let mut child = Command::new(program)
            .args(args)
            .env("DISCORD_BOT_TOKEN", token)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BridgeError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Exited("bridge stdout was not captured".into()))?;
        self.consume(BufReader::new(stdout)).await?;

        let status = child.wait().await?;
        Err(BridgeError::Exited(status.to_string()))
    }
}
