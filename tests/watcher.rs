#[path = "support/recording.rs"]
mod recording;

#[path = "watcher/daemon.rs"]
mod daemon;
#[path = "watcher/pipeline.rs"]
mod pipeline;
