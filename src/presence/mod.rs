pub mod aggregate;
pub mod context;
pub mod store;
pub mod types;

pub use aggregate::{AggregateState, TransitionTracker, VoiceOccupancy, any_online};
pub use context::{WatchContext, WatchSettings};
pub use store::{PresenceStore, RecordOutcome};
pub use types::{ChannelId, GuildId, PresenceStatus, TrackedSet, UserId};
