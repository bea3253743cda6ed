use super::{PlatformEvent, Roster};
use crate::error::PlatformError;
use crate::presence::{ChannelId, GuildId, PresenceStatus, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
struct GuildState {
    members: HashSet<UserId>,
    presences: HashMap<UserId, PresenceStatus>,
    voice: HashMap<UserId, ChannelId>,
}

/// Local mirror of guild rosters built from the bridge stream.
///
/// Snapshots replace a guild wholesale; live updates patch it. Answers the
/// [`Roster`] queries without going back to the platform.
#[derive(Debug, Default)]
pub struct RosterCache {
    guilds: RwLock<HashMap<GuildId, GuildState>>,
}

impl RosterCache {
    pub fn apply(&self, event: &PlatformEvent) {
        let mut guilds = self.guilds.write().unwrap_or_else(PoisonError::into_inner);
        match event {
            PlatformEvent::Ready => {}
            PlatformEvent::GuildSnapshot(snapshot) => {
                let mut state = GuildState::default();
                for member in &snapshot.members {
                    state.members.insert(member.user_id.clone());
                    if let Some(status) = member.status {
                        state.presences.insert(member.user_id.clone(), status);
                    }
                }
                for voice in &snapshot.voice_states {
                    if !voice.channel_id.as_str().is_empty() {
                        state
                            .voice
                            .insert(voice.user_id.clone(), voice.channel_id.clone());
                    }
                }
                guilds.insert(snapshot.guild_id.clone(), state);
            }
            PlatformEvent::PresenceUpdate(update) => match &update.guild_id {
                Some(guild_id) => {
                    let state = guilds.entry(guild_id.clone()).or_default();
                    state.members.insert(update.user_id.clone());
                    state.presences.insert(update.user_id.clone(), update.status);
                }
                None => {
                    for state in guilds.values_mut() {
                        if state.members.contains(&update.user_id) {
                            state.presences.insert(update.user_id.clone(), update.status);
                        }
                    }
                }
            },
            PlatformEvent::VoiceStateUpdate(update) => {
                let state = guilds.entry(update.guild_id.clone()).or_default();
                state.members.insert(update.user_id.clone());
                match update.current_channel() {
                    Some(channel) => {
                        state.voice.insert(update.user_id.clone(), channel.clone());
                    }
                    None => {
                        state.voice.remove(&update.user_id);
                    }
                }
            }
        }
    }
}

impl Roster for RosterCache {
    fn guilds(&self) -> Vec<GuildId> {
        let guilds = self.guilds.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<GuildId> = guilds.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn members(&self, guild: &GuildId) -> Result<Vec<UserId>, PlatformError> {
        let guilds = self.guilds.read().unwrap_or_else(PoisonError::into_inner);
        let state = guilds
            .get(guild)
            .ok_or_else(|| PlatformError::UnknownGuild(guild.to_string()))?;
        let mut members: Vec<UserId> = state.members.iter().cloned().collect();
        members.sort();
        Ok(members)
    }

    fn presence(&self, guild: &GuildId, user: &UserId) -> Result<PresenceStatus, PlatformError> {
        let guilds = self.guilds.read().unwrap_or_else(PoisonError::into_inner);
        let state = guilds
            .get(guild)
            .ok_or_else(|| PlatformError::UnknownGuild(guild.to_string()))?;
        state
            .presences
            .get(user)
            .copied()
            .ok_or_else(|| PlatformError::MissingPresence {
                guild_id: guild.to_string(),
                user_id: user.to_string(),
            })
    }

    fn voice_members(
        &self,
        guild: &GuildId,
        channel: &ChannelId,
    ) -> Result<Vec<UserId>, PlatformError> {
        let guilds = self.guilds.read().unwrap_or_else(PoisonError::into_inner);
        let state = guilds
            .get(guild)
            .ok_or_else(|| PlatformError::UnknownGuild(guild.to_string()))?;

        let mut in_channel = Vec::new();
        for (user, user_channel) in &state.voice {
            if user_channel != channel {
                continue;
            }
            if state.members.contains(user) {
                in_channel.push(user.clone());
            } else {
                let err = PlatformError::UnknownMember {
                    guild_id: guild.to_string(),
                    user_id: user.to_string(),
                };
                tracing::warn!("Error retrieving member information: {err}");
            }
        }
        in_channel.sort();
        Ok(in_channel)
    }
}
