use super::types::{PresenceStatus, TrackedSet, UserId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Outcome of [`PresenceStore::record`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The user is not tracked; nothing was stored.
    Ignored,
    Recorded { previous: Option<PresenceStatus> },
}

/// Last-known presence per tracked user.
///
/// Entries are created on the first event or snapshot seed for a user and
/// overwritten afterwards; they are never removed.
#[derive(Debug, Default)]
pub struct PresenceStore {
    tracked: TrackedSet,
    statuses: RwLock<HashMap<UserId, PresenceStatus>>,
}

impl PresenceStore {
    pub fn new(tracked: TrackedSet) -> Self {
        Self {
            tracked,
            statuses: RwLock::new(HashMap::new()),
        }
    }

    pub fn tracked(&self) -> &TrackedSet {
        &self.tracked
    }

    pub fn record(&self, user: &UserId, status: PresenceStatus) -> RecordOutcome {
        if !self.tracked.contains(user) {
            return RecordOutcome::Ignored;
        }
        let previous = self
            .statuses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.clone(), status);
        RecordOutcome::Recorded { previous }
    }

    /// Store a snapshot status unless a live event already recorded one.
    /// Returns whether anything was written.
    pub fn seed(&self, user: &UserId, status: PresenceStatus) -> bool {
        if !self.tracked.contains(user) {
            return false;
        }
        let mut statuses = self.statuses.write().unwrap_or_else(PoisonError::into_inner);
        if statuses.contains_key(user) {
            return false;
        }
        statuses.insert(user.clone(), status);
        true
    }

    pub fn is_recorded(&self, user: &UserId) -> bool {
        self.statuses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(user)
    }

    pub fn status(&self, user: &UserId) -> Option<PresenceStatus> {
        self.statuses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user)
            .copied()
    }

    /// True if any tracked user has a stored status that is not offline.
    pub fn any_tracked_online(&self) -> bool {
        let statuses = self.statuses.read().unwrap_or_else(PoisonError::into_inner);
        self.tracked
            .iter()
            .filter_map(|user| statuses.get(user))
            .any(|status| status.counts_as_online())
    }
}
