//! The boundary to the chat platform.
//!
//! The gateway connection itself lives outside this crate. What comes in is
//! an already-decoded event stream (see [`bridge`]) and what the watcher asks
//! back goes through the [`Roster`] trait.

pub mod bridge;
pub mod cache;
pub mod router;

use crate::error::PlatformError;
use crate::presence::{ChannelId, GuildId, PresenceStatus, UserId};
use serde::{Deserialize, Serialize};

pub use bridge::{EventPump, EventSource};
pub use cache::RosterCache;
pub use router::{HandlerSet, spawn_handlers};

/// Read-only queries against the platform's current view of its guilds.
pub trait Roster: Send + Sync {
    /// Every guild the bot has joined.
    fn guilds(&self) -> Vec<GuildId>;

    /// Member list of a guild.
    fn members(&self, guild: &GuildId) -> Result<Vec<UserId>, PlatformError>;

    /// Current presence of one member.
    fn presence(&self, guild: &GuildId, user: &UserId) -> Result<PresenceStatus, PlatformError>;

    /// Members currently connected to `channel`. Members that cannot be
    /// resolved are skipped by the implementation.
    fn voice_members(
        &self,
        guild: &GuildId,
        channel: &ChannelId,
    ) -> Result<Vec<UserId>, PlatformError>;
}

/// One record of the bridge stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// Full state of one guild, sent before `ready` and after reconnects.
    GuildSnapshot(GuildSnapshot),
    /// The platform connection is up and the snapshots are complete.
    Ready,
    PresenceUpdate(PresenceUpdate),
    VoiceStateUpdate(VoiceStateUpdate),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSnapshot {
    pub guild_id: GuildId,
    #[serde(default)]
    pub members: Vec<MemberPresence>,
    #[serde(default)]
    pub voice_states: Vec<VoiceState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPresence {
    pub user_id: UserId,
    /// Absent when the platform has no presence cached for the member.
    #[serde(default)]
    pub status: Option<PresenceStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceState {
    pub user_id: UserId,
    pub channel_id: ChannelId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    #[serde(default)]
    pub guild_id: Option<GuildId>,
    pub user_id: UserId,
    pub status: PresenceStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceStateUpdate {
    pub guild_id: GuildId,
    pub user_id: UserId,
    #[serde(default)]
    pub channel_id: Option<ChannelId>,
    #[serde(default)]
    pub previous_channel_id: Option<ChannelId>,
}

impl VoiceStateUpdate {
    /// Channel the user is in now. The platform reports "none" as an empty id.
    pub fn current_channel(&self) -> Option<&ChannelId> {
        self.channel_id.as_ref().filter(|id| !id.as_str().is_empty())
    }

    pub fn previous_channel(&self) -> Option<&ChannelId> {
        self.previous_channel_id
            .as_ref()
            .filter(|id| !id.as_str().is_empty())
    }

    /// Whether this update moves the user into or out of `channel`.
    pub fn touches(&self, channel: &ChannelId) -> bool {
        self.current_channel() == Some(channel) || self.previous_channel() == Some(channel)
    }
}
