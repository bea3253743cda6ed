use super::{PresenceUpdate, Roster, VoiceStateUpdate};
use crate::presence::WatchContext;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const HANDLER_QUEUE_DEPTH: usize = 64;

/// Senders for the handler tasks active in the current mode.
///
/// Presence and voice updates go to separate tasks, so one kind never waits
/// behind the other. A kind whose handler is not registered is dropped at
/// [`dispatch_presence`](Self::dispatch_presence) /
/// [`dispatch_voice`](Self::dispatch_voice).
#[derive(Debug, Clone, Default)]
pub struct HandlerSet {
    presence: Option<mpsc::Sender<PresenceUpdate>>,
    voice: Option<mpsc::Sender<VoiceStateUpdate>>,
}

impl HandlerSet {
    pub fn handles_presence(&self) -> bool {
        self.presence.is_some()
    }

    pub fn handles_voice(&self) -> bool {
        self.voice.is_some()
    }

    pub async fn dispatch_presence(&self, update: PresenceUpdate) {
        let Some(tx) = &self.presence else { return };
        if tx.send(update).await.is_err() {
            tracing::warn!("Presence handler is gone; update dropped");
        }
    }

    pub async fn dispatch_voice(&self, update: VoiceStateUpdate) {
        let Some(tx) = &self.voice else { return };
        if tx.send(update).await.is_err() {
            tracing::warn!("Voice handler is gone; update dropped");
        }
    }
}

/// Register the handlers for the configured mode:
///
/// | mode                        | presence | voice |
/// |-----------------------------|----------|-------|
/// | no voice channel            | yes      | no    |
/// | voice channel               | yes      | yes   |
/// | voice channel, voice-only   | no       | yes   |
///
/// Each task exits once every [`HandlerSet`] clone has been dropped and its
/// queue is drained.
pub fn spawn_handlers(
    ctx: Arc<WatchContext>,
    roster: Arc<dyn Roster>,
) -> (HandlerSet, Vec<JoinHandle<()>>) {
    let mut set = HandlerSet::default();
    let mut handles = Vec::new();

    if ctx.settings().presence_enabled() {
        let (tx, mut rx) = mpsc::channel::<PresenceUpdate>(HANDLER_QUEUE_DEPTH);
        let ctx = Arc::clone(&ctx);
        handles.push(tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                ctx.handle_presence(&update.user_id, update.status);
            }
        }));
        set.presence = Some(tx);
    }

    if ctx.settings().voice_enabled() {
        let (tx, mut rx) = mpsc::channel::<VoiceStateUpdate>(HANDLER_QUEUE_DEPTH);
        let ctx = Arc::clone(&ctx);
        handles.push(tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                ctx.handle_voice_state(roster.as_ref(), &update);
            }
        }));
        set.voice = Some(tx);
    }

    tracing::debug!(
        presence = set.handles_presence(),
        voice = set.handles_voice(),
        "event handlers registered"
    );
    (set, handles)
}
