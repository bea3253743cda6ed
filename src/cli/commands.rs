use clap::Parser;
use std::path::PathBuf;

/// `presence-hook` - run a script when tracked users come online or go offline.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "presence-hook")]
#[command(version)]
#[command(
    about = "Runs an online/offline script when tracked users' presence or voice state settles.",
    long_about = None
)]
pub struct Cli {
    /// Script to run when someone tracked comes online
    #[arg(long, value_name = "PATH")]
    pub online_script: Option<PathBuf>,

    /// Script to run when everyone tracked has gone offline
    #[arg(long, value_name = "PATH")]
    pub offline_script: Option<PathBuf>,

    /// Assume someone is online at startup and run the online script
    #[arg(long)]
    pub start_online: bool,

    /// Assume everyone is offline at startup and run the offline script
    #[arg(long)]
    pub start_offline: bool,

    /// Only count users in VOICE_CHANNEL as online; ignore presence
    #[arg(long)]
    pub vc_only: bool,

    /// Command that streams platform events as JSON lines (default: read stdin)
    #[arg(long, value_name = "COMMAND")]
    pub bridge: Option<String>,

    /// Scheduler evaluation period in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 500)]
    pub tick_ms: u64,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    pub verbose: bool,

    /// Bot token, handed to the bridge command
    #[arg(long, env = "DISCORD_BOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Seconds to wait between two script runs
    #[arg(long = "cooldown", env = "COOLDOWN_BTWN_SCRIPTS_SECONDS", value_name = "SECONDS")]
    pub cooldown_secs: Option<String>,

    /// Voice channel id to watch
    #[arg(long, env = "VOICE_CHANNEL", value_name = "ID")]
    pub voice_channel: Option<String>,

    /// Comma-separated user ids to track
    #[arg(long = "users", env = "USERS_IDS_TO_TRACK", value_name = "IDS")]
    pub users: Option<String>,
}
