use super::aggregate::{AggregateState, TransitionTracker, VoiceOccupancy, any_online};
use super::store::{PresenceStore, RecordOutcome};
use super::types::{ChannelId, PresenceStatus, TrackedSet, UserId};
use crate::observability::DedupLog;
use crate::transport::{Roster, VoiceStateUpdate};
use std::sync::atomic::{AtomicBool, Ordering};

/// Static watch configuration.
#[derive(Debug, Clone, Default)]
pub struct WatchSettings {
    pub tracked: TrackedSet,
    pub voice_channel: Option<ChannelId>,
    pub voice_only: bool,
}

impl WatchSettings {
    /// Presence events are ignored in voice-only mode.
    pub fn presence_enabled(&self) -> bool {
        !self.voice_only
    }

    pub fn voice_enabled(&self) -> bool {
        self.voice_channel.is_some()
    }
}

/// Everything the event handlers mutate and the scheduler reads.
///
/// Each store has its own lock; handlers may run concurrently with each
/// other and with the scheduler.
#[derive(Debug)]
pub struct WatchContext {
    settings: WatchSettings,
    presence: PresenceStore,
    voice: VoiceOccupancy,
    tracker: TransitionTracker,
    forced_start: AtomicBool,
    quiet_log: DedupLog,
}

impl WatchContext {
    pub fn new(settings: WatchSettings) -> Self {
        Self {
            presence: PresenceStore::new(settings.tracked.clone()),
            settings,
            voice: VoiceOccupancy::default(),
            tracker: TransitionTracker::default(),
            forced_start: AtomicBool::new(false),
            quiet_log: DedupLog::default(),
        }
    }

    pub fn settings(&self) -> &WatchSettings {
        &self.settings
    }

    pub fn presence(&self) -> &PresenceStore {
        &self.presence
    }

    pub fn voice(&self) -> &VoiceOccupancy {
        &self.voice
    }

    pub fn tracker(&self) -> &TransitionTracker {
        &self.tracker
    }

    pub fn aggregate(&self) -> AggregateState {
        self.tracker.snapshot()
    }

    /// Shared with the scheduler so repeated messages from either side are
    /// collapsed together.
    pub fn quiet_log(&self) -> &DedupLog {
        &self.quiet_log
    }

    /// Current aggregate computed from the stores.
    pub fn compute_any_online(&self) -> bool {
        any_online(self.settings.voice_only, self.voice.get(), || {
            self.presence.any_tracked_online()
        })
    }

    /// Apply a presence update for `user`.
    pub fn handle_presence(&self, user: &UserId, status: PresenceStatus) {
        if !self.settings.presence_enabled() {
            self.quiet_log
                .debug(&format!("Ignoring {user} presence update in voice-only mode"));
            return;
        }

        match self.presence.record(user, status) {
            RecordOutcome::Ignored => {
                self.quiet_log
                    .debug(&format!("Ignoring {user} presence update"));
            }
            RecordOutcome::Recorded { previous } => {
                let previous = previous.map_or("none", PresenceStatus::as_str);
                tracing::info!(
                    "{user} had previous status of {previous} and now has status of {status}"
                );
                self.recompute();
            }
        }
    }

    /// Apply a voice-state update by re-reading the configured channel.
    ///
    /// Updates that neither enter nor leave the configured channel are
    /// ignored. A failed roster query leaves every store untouched.
    pub fn handle_voice_state(&self, roster: &dyn Roster, update: &VoiceStateUpdate) {
        let Some(channel) = self.settings.voice_channel.as_ref() else {
            return;
        };
        if !update.touches(channel) {
            let seen = update
                .current_channel()
                .map_or_else(|| "none".to_string(), ToString::to_string);
            self.quiet_log
                .debug(&format!("Ignoring channel update for channel {seen}"));
            return;
        }

        let members = match roster.voice_members(&update.guild_id, channel) {
            Ok(members) => members,
            Err(e) => {
                tracing::warn!("Error getting voice channel state: {e}");
                return;
            }
        };

        let occupied = self.tracked_in(&members);
        let was = self.voice.set(occupied);
        if was != occupied {
            tracing::info!("Tracked users in voice channel {channel}: {occupied}");
        }
        self.recompute();
    }

    /// Seed the stores from the platform's current view.
    ///
    /// Presence is only seeded for tracked users with no record yet. Voice
    /// occupancy is the union over every guild that answered. Each seed goes
    /// through the same flip detection as a live event, unless the aggregate
    /// was forced at startup, in which case the first bootstrap only fills
    /// the stores.
    pub fn bootstrap(&self, roster: &dyn Roster) {
        let keep_forced = self.forced_start.swap(false, Ordering::SeqCst);
        let mut in_voice: Option<bool> = None;

        for guild in roster.guilds() {
            let members = match roster.members(&guild) {
                Ok(members) => members,
                Err(e) => {
                    tracing::warn!("Failed to get members for guild {guild}: {e}");
                    continue;
                }
            };

            if self.settings.presence_enabled() {
                for user in members.iter().filter(|u| self.settings.tracked.contains(u)) {
                    if self.presence.is_recorded(user) {
                        continue;
                    }
                    let status = match roster.presence(&guild, user) {
                        Ok(status) => status,
                        Err(e) => {
                            tracing::warn!(
                                "Failed to get presence for member {user} in guild {guild}: {e}"
                            );
                            continue;
                        }
                    };
                    if self.presence.seed(user, status) && !keep_forced {
                        self.recompute();
                    }
                }
            }

            if let Some(channel) = self.settings.voice_channel.as_ref() {
                match roster.voice_members(&guild, channel) {
                    Ok(occupants) => {
                        let found = self.tracked_in(&occupants);
                        in_voice = Some(in_voice.unwrap_or(false) || found);
                    }
                    Err(e) => tracing::warn!("Error getting guild state for {guild}: {e}"),
                }
            }
        }

        if let Some(occupied) = in_voice {
            self.voice.set(occupied);
            if !keep_forced {
                self.recompute();
            }
        }

        let state = self.aggregate();
        tracing::info!(
            tracked = self.settings.tracked.len(),
            any_online = state.any_online,
            "Seeded presence from roster snapshot"
        );
    }

    /// Pin the aggregate at startup. The next [`bootstrap`](Self::bootstrap)
    /// fills the stores without overriding this value.
    pub fn force_aggregate(&self, any_online: bool) {
        self.tracker.force(any_online);
        self.forced_start.store(true, Ordering::SeqCst);
    }

    fn tracked_in(&self, members: &[UserId]) -> bool {
        members.iter().any(|m| self.settings.tracked.contains(m))
    }

    fn recompute(&self) {
        if let Some(now_online) = self.tracker.observe(|| self.compute_any_online()) {
            tracing::info!("Aggregate state changed: any_online={now_online}");
        }
    }
}
