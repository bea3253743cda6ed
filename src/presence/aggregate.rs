use std::sync::{PoisonError, RwLock, RwLockReadGuard};
use tokio::time::Instant;

/// "Is any tracked user in the configured voice channel."
///
/// Always replaced wholesale from a fresh channel roster, never merged.
#[derive(Debug, Default)]
pub struct VoiceOccupancy {
    occupied: RwLock<bool>,
}

impl VoiceOccupancy {
    /// Returns the previous value.
    pub fn set(&self, occupied: bool) -> bool {
        let mut guard = self.occupied.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, occupied)
    }

    pub fn get(&self) -> bool {
        *self.occupied.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decide whether anyone counts as online.
///
/// Evaluation order is fixed:
/// 1. voice-only mode returns the voice flag as-is;
/// 2. otherwise a set voice flag wins;
/// 3. otherwise fall back to stored presence.
///
/// `presence_online` is only called in the third case.
pub fn any_online(voice_only: bool, in_voice: bool, presence_online: impl FnOnce() -> bool) -> bool {
    if voice_only {
        return in_voice;
    }
    if in_voice {
        return true;
    }
    presence_online()
}

/// The aggregate the scheduler reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AggregateState {
    pub any_online: bool,
    /// Stamped only when `any_online` actually flips. `None` until the first flip.
    pub last_change_at: Option<Instant>,
    /// Set by every presence or voice event, flip or not.
    pub observed_event: bool,
}

impl AggregateState {
    /// Whether the aggregate has been stable for at least `period` at `now`.
    pub fn settled(&self, now: Instant, period: std::time::Duration) -> bool {
        self.last_change_at
            .is_none_or(|changed| now.saturating_duration_since(changed) >= period)
    }
}

/// Guards the aggregate and its change timestamp under one lock so the
/// read-compare-update in [`TransitionTracker::observe`] is atomic.
#[derive(Debug, Default)]
pub struct TransitionTracker {
    state: RwLock<AggregateState>,
}

impl TransitionTracker {
    /// Mark an event as observed and recompute the aggregate with `compute`.
    /// Returns the new value when it flipped.
    pub fn observe(&self, compute: impl FnOnce() -> bool) -> Option<bool> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.observed_event = true;
        let next = compute();
        if next == state.any_online {
            return None;
        }
        state.any_online = next;
        state.last_change_at = Some(Instant::now());
        Some(next)
    }

    /// Overwrite the aggregate regardless of the stores.
    pub fn force(&self, any_online: bool) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.observed_event = true;
        state.any_online = any_online;
        state.last_change_at = Some(Instant::now());
    }

    pub fn snapshot(&self) -> AggregateState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hold the aggregate steady while reading other state alongside it.
    pub fn read(&self) -> RwLockReadGuard<'_, AggregateState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }
}
