use presence_hook::error::ScriptError;
use presence_hook::scripts::ScriptLauncher;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Mutex;
use tokio::time::Instant;

/// Launcher that records which script ran and when, without spawning.
#[derive(Default)]
pub struct RecordingLauncher {
    runs: Mutex<Vec<(String, Instant)>>,
}

impl RecordingLauncher {
    pub fn runs(&self) -> Vec<(String, Instant)> {
        self.runs.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<String> {
        self.runs().into_iter().map(|(name, _)| name).collect()
    }
}

impl ScriptLauncher for RecordingLauncher {
    fn launch<'a>(
        &'a self,
        path: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), ScriptError>> + Send + 'a>> {
        Box::pin(async move {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.runs.lock().unwrap().push((name, Instant::now()));
            Ok(())
        })
    }
}
