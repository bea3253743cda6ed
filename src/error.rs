use std::path::PathBuf;
use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `presence-hook`.
///
/// Startup validation surfaces as [`ConfigError`]; everything that can go
/// wrong while the watcher is running is logged and absorbed, so the other
/// variants mostly travel as far as a `tracing::warn!`.
#[derive(Debug, Error)]
pub enum HookError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Platform queries ────────────────────────────────────────────────
    #[error("platform: {0}")]
    Platform(#[from] PlatformError),

    // ── Event bridge ────────────────────────────────────────────────────
    #[error("bridge: {0}")]
    Bridge(#[from] BridgeError),

    // ── Script execution ────────────────────────────────────────────────
    #[error("script: {0}")]
    Script(#[from] ScriptError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("please provide a path for the {role} script")]
    MissingScript { role: &'static str },

    #[error("couldn't find {role} script {}", path.display())]
    ScriptNotFound { role: &'static str, path: PathBuf },

    #[error("{role} script {} is not a regular file", path.display())]
    ScriptNotFile { role: &'static str, path: PathBuf },

    #[error("{role} script {} is not executable", path.display())]
    ScriptNotExecutable { role: &'static str, path: PathBuf },

    #[error("cannot inspect {role} script {}: {source}", path.display())]
    ScriptMetadata {
        role: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot start both online and offline; pick one of --start-online / --start-offline")]
    ConflictingStartState,

    #[error("DISCORD_BOT_TOKEN must not be empty")]
    MissingToken,

    #[error("--vc-only requires a valid numeric VOICE_CHANNEL")]
    VoiceChannelRequired,

    #[error("bridge command is empty")]
    EmptyBridgeCommand,
}

// ─── Platform query errors ──────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("guild {0} is not known")]
    UnknownGuild(String),

    #[error("member {user_id} not found in guild {guild_id}")]
    UnknownMember { guild_id: String, user_id: String },

    #[error("no presence for member {user_id} in guild {guild_id}")]
    MissingPresence { guild_id: String, user_id: String },
}

// ─── Bridge errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("malformed bridge record: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("failed to start bridge `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("bridge stream read failed: {0}")]
    Read(#[from] std::io::Error),

    #[error("bridge exited: {0}")]
    Exited(String),

    #[error("bridge kept failing; gave up after {restarts} restarts")]
    GaveUp { restarts: u32 },
}

// ─── Script errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to start {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} exited with {status}", path.display())]
    NonZeroExit { path: PathBuf, status: String },
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, HookError>;
