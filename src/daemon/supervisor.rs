use anyhow::Result;
use std::future::Future;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Restart policy for a supervised component.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) struct RestartPolicy {
    pub initial_backoff_secs: u64,
    pub max_backoff_secs: u64,
    /// Consecutive failures tolerated before the circuit opens. 0 = unlimited.
    pub max_restarts: u32,
}

/// Run `run_component` until it has failed more than `max_restarts` times in
/// a row, sleeping with exponential backoff between attempts. The returned
/// handle completes only when the circuit opens.
pub(super) fn spawn_component_supervisor<F, Fut>(
    name: &'static str,
    policy: RestartPolicy,
    mut run_component: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let initial_backoff = policy.initial_backoff_secs.max(1);
        let max_backoff = policy.max_backoff_secs.max(initial_backoff);
        let mut backoff = initial_backoff;
        let mut consecutive_failures: u32 = 0;

        loop {
            tracing::info!("Component '{name}' starting");
            match run_component().await {
                Ok(()) => {
                    tracing::warn!("Component '{name}' exited unexpectedly");
                    backoff = initial_backoff;
                    consecutive_failures = consecutive_failures.saturating_add(1);
                }
                Err(e) => {
                    tracing::error!("Component '{name}' failed: {e}");
                    consecutive_failures = consecutive_failures.saturating_add(1);
                }
            }

            if policy.max_restarts > 0 && consecutive_failures > policy.max_restarts {
                tracing::error!(
                    "Component '{name}' exceeded max restarts ({}), circuit open",
                    policy.max_restarts
                );
                break;
            }
            tracing::info!("Restarting '{name}' in {backoff}s");
            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff = backoff.saturating_mul(2).min(max_backoff);
        }
    })
}
