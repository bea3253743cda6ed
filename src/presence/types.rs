use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Platform user snowflake, kept opaque.
    UserId
);
string_id!(GuildId);
string_id!(ChannelId);

/// Last reported presence of a user.
///
/// Anything the platform sends that is not one of the known statuses
/// deserializes to [`PresenceStatus::Unknown`] and is treated like an absent
/// record by the aggregator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Idle,
    #[serde(rename = "dnd")]
    DoNotDisturb,
    Offline,
    #[serde(other)]
    Unknown,
}

impl PresenceStatus {
    pub fn counts_as_online(self) -> bool {
        matches!(self, Self::Online | Self::Idle | Self::DoNotDisturb)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Idle => "idle",
            Self::DoNotDisturb => "dnd",
            Self::Offline => "offline",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PresenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The users being watched. Fixed after startup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TrackedSet {
    ids: HashSet<UserId>,
}

impl TrackedSet {
    /// Parse a comma-separated id list. Entries are trimmed and empty entries
    /// are dropped, so `" a , ,b,"` yields `{a, b}`.
    pub fn parse(raw: &str) -> Self {
        raw.split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(UserId::from)
            .collect()
    }

    pub fn contains(&self, user: &UserId) -> bool {
        self.ids.contains(user)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserId> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl FromIterator<UserId> for TrackedSet {
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}
