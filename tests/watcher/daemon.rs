use super::recording::RecordingLauncher;
use presence_hook::config::{Config, StartState};
use presence_hook::daemon;
use presence_hook::error::{BridgeError, HookError};
use presence_hook::presence::{TrackedSet, WatchSettings};
use presence_hook::scheduler::SchedulerPolicy;
use presence_hook::scripts::ScriptPaths;
use presence_hook::transport::EventSource;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_test::assert_ok;
use zeroize::Zeroizing;

fn config(start: Option<StartState>, source: EventSource) -> Config {
    Config {
        scripts: ScriptPaths {
            online: PathBuf::from("online"),
            offline: PathBuf::from("offline"),
        },
        start,
        token: Zeroizing::new("bridge-token".to_string()),
        watch: WatchSettings {
            tracked: TrackedSet::parse("1"),
            voice_channel: None,
            voice_only: false,
        },
        policy: SchedulerPolicy::default(),
        source,
    }
}

#[cfg(unix)]
fn bridge_script(dir: &tempfile::TempDir) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.path().join("bridge.sh");
    std::fs::write(
        &path,
        concat!(
            "#!/bin/sh\n",
            "[ \"$DISCORD_BOT_TOKEN\" = \"bridge-token\" ] || exit 3\n",
            "echo '{\"type\":\"guild_snapshot\",\"guild_id\":\"9\",\"members\":[{\"user_id\":\"1\",\"status\":\"offline\"}]}'\n",
            "echo '{\"type\":\"ready\"}'\n",
            "exec sleep 30\n",
        ),
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[tokio::test]
async fn forced_start_runs_script_before_events() {
    let tmp = tempfile::TempDir::new().unwrap();
    let bridge = bridge_script(&tmp);
    let launcher = Arc::new(RecordingLauncher::default());

    let result = daemon::run_with(
        config(
            Some(StartState::Online),
            EventSource::Command(bridge.display().to_string()),
        ),
        launcher.clone(),
        tokio::io::empty(),
        tokio::time::sleep(Duration::from_millis(300)),
    )
    .await;

    assert_ok!(result);
    // The first seed leaves the forced aggregate in place.
    assert_eq!(launcher.kinds(), vec!["online"]);
}

#[cfg(unix)]
#[tokio::test]
async fn unforced_start_follows_seeded_state() {
    let tmp = tempfile::TempDir::new().unwrap();
    let bridge = bridge_script(&tmp);
    let launcher = Arc::new(RecordingLauncher::default());

    let result = daemon::run_with(
        config(None, EventSource::Command(bridge.display().to_string())),
        launcher.clone(),
        tokio::io::empty(),
        tokio::time::sleep(Duration::from_millis(1500)),
    )
    .await;

    assert_ok!(result);
    // Seeding "offline" is an event without a flip, so the first decision acts at once.
    assert_eq!(launcher.kinds(), vec!["offline"]);
}

#[tokio::test(start_paused = true)]
async fn end_of_input_keeps_pending_transition_alive() {
    let launcher = Arc::new(RecordingLauncher::default());
    let input = std::io::Cursor::new(
        [
            r#"{"type":"guild_snapshot","guild_id":"9","members":[{"user_id":"1","status":"offline"}]}"#,
            r#"{"type":"ready"}"#,
            r#"{"type":"presence_update","guild_id":"9","user_id":"1","status":"online"}"#,
        ]
        .join("\n")
        .into_bytes(),
    );
    let start = Instant::now();

    let result = daemon::run_with(
        config(None, EventSource::Stdin),
        launcher.clone(),
        input,
        tokio::time::sleep(Duration::from_secs(60)),
    )
    .await;

    assert_ok!(result);
    assert!(start.elapsed() >= Duration::from_secs(60));
    // Whether or not the seeded offline state ran first, the online transition
    // that arrived just before the input ended must still be acted on.
    let kinds = launcher.kinds();
    assert_eq!(kinds.last().map(String::as_str), Some("online"));
}

#[tokio::test(start_paused = true)]
async fn failing_bridge_opens_circuit_and_errors() {
    let launcher = Arc::new(RecordingLauncher::default());

    let result = daemon::run_with(
        config(
            None,
            EventSource::Command("/nonexistent/presence-bridge".to_string()),
        ),
        launcher.clone(),
        tokio::io::empty(),
        std::future::pending::<()>(),
    )
    .await;

    assert!(matches!(
        result,
        Err(HookError::Bridge(BridgeError::GaveUp { restarts: 10 }))
    ));
    assert!(launcher.runs().is_empty());
}
