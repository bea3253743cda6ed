use super::*;
use tempfile::TempDir;

fn script(dir: &TempDir, name: &str, executable: bool) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = if executable { 0o755 } else { 0o644 };
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
    }
    #[cfg(not(unix))]
    let _ = executable;
    path
}

fn valid_cli(dir: &TempDir) -> Cli {
    Cli {
        online_script: Some(script(dir, "on.sh", true)),
        offline_script: Some(script(dir, "off.sh", true)),
        tick_ms: 500,
        token: Some("token".into()),
        users: Some("1, 2,,3".into()),
        ..Cli::default()
    }
}

#[test]
fn valid_configuration() {
    let tmp = TempDir::new().unwrap();
    let config = Config::from_cli(&valid_cli(&tmp)).unwrap();

    assert_eq!(config.start, None);
    assert_eq!(config.watch.tracked.len(), 3);
    assert_eq!(config.watch.voice_channel, None);
    assert_eq!(config.policy.cooldown, DEFAULT_COOLDOWN);
    assert_eq!(config.policy.tick, Duration::from_millis(500));
    assert_eq!(config.source, EventSource::Stdin);
    assert_eq!(config.token.as_str(), "token");
}

#[test]
fn debug_output_redacts_token() {
    let tmp = TempDir::new().unwrap();
    let mut cli = valid_cli(&tmp);
    cli.token = Some("very-secret-token".into());
    let config = Config::from_cli(&cli).unwrap();

    let rendered = format!("{config:?}");
    assert!(!rendered.contains("very-secret-token"));
    assert!(rendered.contains("[REDACTED]"));
}

#[test]
fn missing_script_path() {
    let tmp = TempDir::new().unwrap();
    let mut cli = valid_cli(&tmp);
    cli.offline_script = None;
    assert!(matches!(
        Config::from_cli(&cli),
        Err(ConfigError::MissingScript { role: "offline" })
    ));
}

#[test]
fn nonexistent_script() {
    let tmp = TempDir::new().unwrap();
    let mut cli = valid_cli(&tmp);
    cli.online_script = Some(tmp.path().join("nope.sh"));
    assert!(matches!(
        Config::from_cli(&cli),
        Err(ConfigError::ScriptNotFound { role: "online", .. })
    ));
}

#[test]
fn directory_is_not_a_script() {
    let tmp = TempDir::new().unwrap();
    let mut cli = valid_cli(&tmp);
    cli.online_script = Some(tmp.path().to_path_buf());
    assert!(matches!(
        Config::from_cli(&cli),
        Err(ConfigError::ScriptNotFile { .. })
    ));
}

#[cfg(unix)]
#[test]
fn script_without_execute_bit() {
    let tmp = TempDir::new().unwrap();
    let mut cli = valid_cli(&tmp);
    cli.offline_script = Some(script(&tmp, "plain.sh", false));
    assert!(matches!(
        Config::from_cli(&cli),
        Err(ConfigError::ScriptNotExecutable { role: "offline", .. })
    ));
}

#[test]
fn conflicting_start_flags() {
    let tmp = TempDir::new().unwrap();
    let mut cli = valid_cli(&tmp);
    cli.start_online = true;
    cli.start_offline = true;
    assert!(matches!(
        Config::from_cli(&cli),
        Err(ConfigError::ConflictingStartState)
    ));

    cli.start_offline = false;
    let config = Config::from_cli(&cli).unwrap();
    assert_eq!(config.start, Some(StartState::Online));
    assert!(config.start.is_some_and(StartState::any_online));
}

#[test]
fn conflicting_flags_are_checked_before_token() {
    let tmp = TempDir::new().unwrap();
    let mut cli = valid_cli(&tmp);
    cli.start_online = true;
    cli.start_offline = true;
    cli.token = None;
    assert!(matches!(
        Config::from_cli(&cli),
        Err(ConfigError::ConflictingStartState)
    ));
}

#[test]
fn blank_token_is_missing() {
    let tmp = TempDir::new().unwrap();
    let mut cli = valid_cli(&tmp);
    cli.token = Some("   ".into());
    assert!(matches!(
        Config::from_cli(&cli),
        Err(ConfigError::MissingToken)
    ));
}

#[test]
fn voice_only_needs_numeric_channel() {
    let tmp = TempDir::new().unwrap();
    let mut cli = valid_cli(&tmp);
    cli.vc_only = true;
    assert!(matches!(
        Config::from_cli(&cli),
        Err(ConfigError::VoiceChannelRequired)
    ));

    cli.voice_channel = Some("general".into());
    assert!(matches!(
        Config::from_cli(&cli),
        Err(ConfigError::VoiceChannelRequired)
    ));

    cli.voice_channel = Some("123".into());
    let config = Config::from_cli(&cli).unwrap();
    assert!(config.watch.voice_only);
    assert_eq!(config.watch.voice_channel, Some(ChannelId::from("123")));
}

#[test]
fn empty_bridge_command_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let mut cli = valid_cli(&tmp);
    cli.bridge = Some("  ".into());
    assert!(matches!(
        Config::from_cli(&cli),
        Err(ConfigError::EmptyBridgeCommand)
    ));

    cli.bridge = Some("node bridge.js".into());
    let config = Config::from_cli(&cli).unwrap();
    assert_eq!(config.source, EventSource::Command("node bridge.js".into()));
}

#[test]
fn cooldown_parsing_falls_back() {
    assert_eq!(parse_cooldown(None), DEFAULT_COOLDOWN);
    assert_eq!(parse_cooldown(Some("")), DEFAULT_COOLDOWN);
    assert_eq!(parse_cooldown(Some("abc")), DEFAULT_COOLDOWN);
    assert_eq!(parse_cooldown(Some("-5")), DEFAULT_COOLDOWN);
    assert_eq!(parse_cooldown(Some(" 90 ")), Duration::from_secs(90));
    assert_eq!(parse_cooldown(Some("0")), Duration::ZERO);
}

#[test]
fn voice_channel_parsing() {
    assert_eq!(parse_voice_channel(None), None);
    assert_eq!(parse_voice_channel(Some("")), None);
    assert_eq!(parse_voice_channel(Some("12ab")), None);
    assert_eq!(
        parse_voice_channel(Some("987654321")),
        Some(ChannelId::from("987654321"))
    );
}
