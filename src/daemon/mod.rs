use crate::config::Config;
use crate::error::{BridgeError, Result};
use crate::presence::{ChannelId, WatchContext};
use crate::scheduler::Scheduler;
use crate::scripts::{ProcessLauncher, ScriptKind, ScriptLauncher, ScriptRunner};
use crate::transport::{EventPump, EventSource, RosterCache, spawn_handlers};
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

mod supervisor;

use supervisor::{RestartPolicy, spawn_component_supervisor};

const BRIDGE_RESTART_POLICY: RestartPolicy = RestartPolicy {
    initial_backoff_secs: 1,
    max_backoff_secs: 60,
    max_restarts: 10,
};

/// Run until Ctrl-C, or until the event bridge gives up.
pub async fn run(config: Config) -> Result<()> {
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };
    let stdin = BufReader::new(tokio::io::stdin());
    run_with(config, Arc::new(ProcessLauncher), stdin, shutdown).await
}

/// Wire the watcher together and run it until `shutdown` resolves.
///
/// With [`EventSource::Stdin`] events are read from `input`; otherwise
/// `input` is unused. The end of `input` is not a reason to stop: queued
/// events are still handled and pending transitions still run their script.
/// Only a bridge whose restart circuit opens ends the run early, as an error.
///
/// A forced start state runs its script before any event is read. On exit
/// the scheduler is cancelled and every task aborted; a script that is still
/// running is left alone.
pub async fn run_with<R, S>(
    config: Config,
    launcher: Arc<dyn ScriptLauncher>,
    input: R,
    shutdown: S,
) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    S: Future<Output = ()>,
{
    let Config {
        scripts,
        start,
        token,
        watch,
        policy,
        source,
    } = config;

    let ctx = Arc::new(WatchContext::new(watch));
    let runner = Arc::new(ScriptRunner::new(scripts, launcher));

    tracing::info!(
        tracked = ctx.settings().tracked.len(),
        voice_channel = ctx
            .settings()
            .voice_channel
            .as_ref()
            .map_or("none", ChannelId::as_str),
        voice_only = ctx.settings().voice_only,
        cooldown_s = policy.cooldown.as_secs(),
        "Watching presence"
    );

    if let Some(start) = start {
        let kind = ScriptKind::for_state(start.any_online());
        tracing::info!("Assuming {kind} at startup");
        ctx.force_aggregate(start.any_online());
        runner.run(kind).await;
    }

    let cancel = CancellationToken::new();
    let mut handles: Vec<JoinHandle<()>> = vec![tokio::spawn(
        Scheduler::new(Arc::clone(&ctx), Arc::clone(&runner), policy).run(cancel.clone()),
    )];

    let cache = Arc::new(RosterCache::default());
    let (handlers, handler_tasks) = spawn_handlers(Arc::clone(&ctx), cache.clone());
    handles.extend(handler_tasks);
    let pump = Arc::new(EventPump::new(Arc::clone(&ctx), cache, handlers));

    let supervised = matches!(source, EventSource::Command(_));
    let mut source_task = match source {
        EventSource::Stdin => {
            tracing::info!("Reading platform events from stdin");
            // The pump is dropped with this task, which closes the handler
            // queues once they have drained.
            tokio::spawn(async move {
                match pump.consume(input).await {
                    Ok(()) => tracing::info!("Event stream closed; watching until shutdown"),
                    Err(e) => tracing::error!("Event stream failed: {e}; watching until shutdown"),
                }
            })
        }
        EventSource::Command(command) => {
            tracing::info!("Starting event bridge `{command}`");
            spawn_component_supervisor("bridge", BRIDGE_RESTART_POLICY, move || {
                let pump = Arc::clone(&pump);
                let command = command.clone();
                let token = token.clone();
                async move {
                    pump.run_command(&command, token.as_str()).await?;
                    Ok::<(), anyhow::Error>(())
                }
            })
        }
    };

    tokio::pin!(shutdown);
    let mut source_done = false;
    let mut gave_up = false;
    loop {
        tokio::select! {
            () = &mut shutdown => {
                tracing::info!("Shutdown requested");
                break;
            }
            _ = &mut source_task, if !source_done => {
                source_done = true;
                if supervised {
                    gave_up = true;
                    break;
                }
            }
        }
    }

    cancel.cancel();
    if !source_done {
        source_task.abort();
        let _ = source_task.await;
    }
    for handle in &handles {
        handle.abort();
    }
    for handle in handles {
        let _ = handle.await;
    }

    if gave_up {
        return Err(BridgeError::GaveUp {
            restarts: BRIDGE_RESTART_POLICY.max_restarts,
        }
        .into());
    }
    Ok(())
}
