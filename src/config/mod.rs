use crate::cli::Cli;
use crate::error::ConfigError;
use crate::presence::{ChannelId, TrackedSet, WatchSettings};
use crate::scheduler::{DEFAULT_COOLDOWN, SchedulerPolicy};
use crate::scripts::ScriptPaths;
use crate::transport::EventSource;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zeroize::Zeroizing;

/// Aggregate value pinned at startup instead of derived from the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartState {
    Online,
    Offline,
}

impl StartState {
    pub fn any_online(self) -> bool {
        self == Self::Online
    }
}

/// Validated runtime configuration.
pub struct Config {
    pub scripts: ScriptPaths,
    pub start: Option<StartState>,
    pub token: Zeroizing<String>,
    pub watch: WatchSettings,
    pub policy: SchedulerPolicy,
    pub source: EventSource,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("scripts", &self.scripts)
            .field("start", &self.start)
            .field("token", &"[REDACTED]")
            .field("watch", &self.watch)
            .field("policy", &self.policy)
            .field("source", &self.source)
            .finish()
    }
}

impl Config {
    /// Validate parsed arguments. Checks run in a fixed order and the first
    /// failure is returned; malformed cooldown or channel values only warn.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let online = validate_script("online", cli.online_script.as_deref())?;
        let offline = validate_script("offline", cli.offline_script.as_deref())?;

        let start = match (cli.start_online, cli.start_offline) {
            (true, true) => return Err(ConfigError::ConflictingStartState),
            (true, false) => Some(StartState::Online),
            (false, true) => Some(StartState::Offline),
            (false, false) => None,
        };

        let token = cli
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?;
        let token = Zeroizing::new(token.to_string());

        let voice_channel = parse_voice_channel(cli.voice_channel.as_deref());
        if cli.vc_only && voice_channel.is_none() {
            return Err(ConfigError::VoiceChannelRequired);
        }

        let source = match &cli.bridge {
            Some(command) if command.trim().is_empty() => {
                return Err(ConfigError::EmptyBridgeCommand);
            }
            bridge => EventSource::from_bridge(bridge.clone()),
        };

        let tracked = TrackedSet::parse(cli.users.as_deref().unwrap_or_default());
        if tracked.is_empty() {
            tracing::warn!("USERS_IDS_TO_TRACK is empty; nobody will ever count as online");
        }

        Ok(Self {
            scripts: ScriptPaths { online, offline },
            start,
            token,
            watch: WatchSettings {
                tracked,
                voice_channel,
                voice_only: cli.vc_only,
            },
            policy: SchedulerPolicy {
                tick: Duration::from_millis(cli.tick_ms.max(1)),
                cooldown: parse_cooldown(cli.cooldown_secs.as_deref()),
                ..SchedulerPolicy::default()
            },
            source,
        })
    }
}

/// A script must be a non-empty path to an existing regular file, and on
/// unix carry at least one execute bit.
pub fn validate_script(role: &'static str, path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    let path = match path {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return Err(ConfigError::MissingScript { role }),
    };

    let metadata = std::fs::metadata(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ConfigError::ScriptNotFound {
                role,
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::ScriptMetadata {
                role,
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    if !metadata.is_file() {
        return Err(ConfigError::ScriptNotFile {
            role,
            path: path.to_path_buf(),
        });
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(ConfigError::ScriptNotExecutable {
                role,
                path: path.to_path_buf(),
            });
        }
    }

    Ok(path.to_path_buf())
}

/// Seconds between script runs. Absent, non-numeric and negative values fall
/// back to the default.
pub fn parse_cooldown(raw: Option<&str>) -> Duration {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return DEFAULT_COOLDOWN;
    };
    match raw.parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(e) => {
            tracing::warn!(
                "Invalid COOLDOWN_BTWN_SCRIPTS_SECONDS {raw:?} ({e}); using default of {}s",
                DEFAULT_COOLDOWN.as_secs()
            );
            DEFAULT_COOLDOWN
        }
    }
}

/// Channel ids are numeric; anything else disables voice tracking.
pub fn parse_voice_channel(raw: Option<&str>) -> Option<ChannelId> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
    match raw.parse::<u64>() {
        Ok(_) => Some(ChannelId::from(raw)),
        Err(e) => {
            tracing::warn!("Ignoring VOICE_CHANNEL {raw:?}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests;
