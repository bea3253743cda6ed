use super::recording::RecordingLauncher;
use presence_hook::presence::{ChannelId, TrackedSet, WatchContext, WatchSettings};
use presence_hook::scheduler::{DEFAULT_COOLDOWN, Scheduler, SchedulerPolicy};
use presence_hook::scripts::{ScriptPaths, ScriptRunner};
use presence_hook::transport::{EventPump, RosterCache, spawn_handlers};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

struct Pipeline {
    ctx: Arc<WatchContext>,
    pump: EventPump,
    launcher: Arc<RecordingLauncher>,
    cancel: CancellationToken,
}

impl Pipeline {
    fn start(settings: WatchSettings) -> Self {
        let ctx = Arc::new(WatchContext::new(settings));
        let launcher = Arc::new(RecordingLauncher::default());
        let runner = Arc::new(ScriptRunner::new(
            ScriptPaths {
                online: PathBuf::from("online"),
                offline: PathBuf::from("offline"),
            },
            launcher.clone(),
        ));

        let cancel = CancellationToken::new();
        tokio::spawn(
            Scheduler::new(Arc::clone(&ctx), runner, SchedulerPolicy::default())
                .run(cancel.clone()),
        );

        let cache = Arc::new(RosterCache::default());
        let (handlers, _tasks) = spawn_handlers(Arc::clone(&ctx), cache.clone());
        let pump = EventPump::new(Arc::clone(&ctx), cache, handlers);

        Self {
            ctx,
            pump,
            launcher,
            cancel,
        }
    }

    async fn feed(&self, lines: &[&str]) {
        let stream = lines.join("\n");
        self.pump.consume(stream.as_bytes()).await.unwrap();
    }
}

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

#[tokio::test(start_paused = true)]
async fn voice_only_join_and_move_away() {
    let p = Pipeline::start(WatchSettings {
        tracked: TrackedSet::parse("1"),
        voice_channel: Some(ChannelId::from("123")),
        voice_only: true,
    });

    p.feed(&[
        r#"{"type":"guild_snapshot","guild_id":"9","members":[{"user_id":"1","status":"online"}]}"#,
        r#"{"type":"ready"}"#,
    ])
    .await;

    // Nobody in voice: the first decision runs the offline script.
    time::sleep(secs(0.25)).await;
    assert_eq!(p.launcher.kinds(), vec!["offline"]);
    assert!(!p.ctx.aggregate().any_online);

    p.feed(&[
        r#"{"type":"voice_state_update","guild_id":"9","user_id":"1","channel_id":"123"}"#,
        r#"{"type":"presence_update","guild_id":"9","user_id":"1","status":"offline"}"#,
    ])
    .await;

    time::sleep(secs(28.75)).await;
    assert!(p.ctx.aggregate().any_online);
    assert_eq!(p.launcher.runs().len(), 1);

    time::sleep(secs(2.0)).await;
    assert_eq!(p.launcher.kinds(), vec!["offline", "online"]);

    p.feed(&[
        r#"{"type":"voice_state_update","guild_id":"9","user_id":"1","channel_id":"456","previous_channel_id":"123"}"#,
    ])
    .await;

    time::sleep(secs(18.75)).await;
    assert!(!p.ctx.aggregate().any_online);
    assert_eq!(p.launcher.runs().len(), 2);

    // The cooldown from the online run still has to elapse.
    time::sleep(secs(12.0)).await;
    let runs = p.launcher.runs();
    assert_eq!(p.launcher.kinds(), vec!["offline", "online", "offline"]);
    for pair in runs.windows(2) {
        assert!(pair[1].1 - pair[0].1 >= DEFAULT_COOLDOWN);
    }

    p.cancel.cancel();
}

#[tokio::test(start_paused = true)]
async fn presence_mode_seeds_then_follows_updates() {
    let p = Pipeline::start(WatchSettings {
        tracked: TrackedSet::parse("1,2"),
        voice_channel: None,
        voice_only: false,
    });
    let start = Instant::now();

    p.feed(&[
        r#"{"type":"guild_snapshot","guild_id":"9","members":[{"user_id":"1","status":"offline"},{"user_id":"2","status":"idle"},{"user_id":"3","status":"online"}]}"#,
        "this line is not json",
        r#"{"type":"ready"}"#,
    ])
    .await;
    assert_eq!(p.pump.bootstraps(), 1);
    assert!(p.ctx.aggregate().any_online);

    // Seeding flipped the aggregate, so the first run waits for the debounce.
    time::sleep(secs(4.0)).await;
    assert!(p.launcher.runs().is_empty());
    time::sleep(secs(1.5)).await;
    let runs = p.launcher.runs();
    assert_eq!(p.launcher.kinds(), vec!["online"]);
    assert!(runs[0].1 - start >= Duration::from_secs(5));

    // Untracked users never matter.
    p.feed(&[r#"{"type":"presence_update","guild_id":"9","user_id":"3","status":"offline"}"#])
        .await;
    p.feed(&[r#"{"type":"presence_update","guild_id":"9","user_id":"2","status":"offline"}"#])
        .await;

    time::sleep(secs(60.0)).await;
    assert!(!p.ctx.aggregate().any_online);
    assert_eq!(p.launcher.kinds(), vec!["online", "offline"]);

    p.cancel.cancel();
}
