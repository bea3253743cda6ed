use std::sync::{Mutex, PoisonError};
use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber. `RUST_LOG` takes precedence over
/// `verbose`.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
    {
        eprintln!("Warning: failed to install tracing subscriber: {e}");
    }
}

/// Debug logger that drops a message identical to the one before it.
///
/// The scheduler re-evaluates twice a second and would otherwise print the
/// same reason on every tick.
#[derive(Debug, Default)]
pub struct DedupLog {
    last: Mutex<Option<String>>,
}

impl DedupLog {
    pub fn debug(&self, message: &str) {
        if self.should_emit(message) {
            tracing::debug!("{message}");
        }
    }

    fn should_emit(&self, message: &str) -> bool {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if last.as_deref() == Some(message) {
            return false;
        }
        *last = Some(message.to_string());
        true
    }
}
