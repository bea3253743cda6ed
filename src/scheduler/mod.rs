//! Debounce/cooldown decision loop.
//!
//! Reads the aggregate produced by the event handlers on a fixed period and
//! turns each settled transition into at most one script run:
//!
//! ```text
//!            tick                      cooldown elapsed
//!  Watching ──────► decide ──────────────────────────────┐
//!     ▲               │ hold                             │
//!     ├───────────────┘                                  │
//!     │               │ cooldown pending                 ▼
//!     │               └──────────────► CoolingDown ─► re-check once
//!     │               │ dispatch                         │
//!     │               ▼                                  │
//!     └──────────── Running (awaits the script) ◄────────┘
//! ```

use crate::presence::{AggregateState, WatchContext};
use crate::scripts::{ScriptExecutionState, ScriptKind, ScriptRunner};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Minimum settle time after an aggregate flip before acting on it.
pub const DEBOUNCE_PERIOD: Duration = Duration::from_secs(5);
pub const DEFAULT_TICK: Duration = Duration::from_millis(500);
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerPolicy {
    pub tick: Duration,
    pub debounce: Duration,
    /// Minimum spacing between the end of one script and the start of the next.
    pub cooldown: Duration,
}

impl Default for SchedulerPolicy {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            debounce: DEBOUNCE_PERIOD,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// Why a tick did nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hold {
    NoEventYet,
    Debouncing,
    AlreadyHandled,
    ScriptRunning,
}

impl Hold {
    pub fn message(self) -> &'static str {
        match self {
            Self::NoEventYet => {
                "Haven't received any presence changes, not attempting to run a script until then."
            }
            Self::Debouncing => "Debouncing...",
            Self::AlreadyHandled => "Already ran script for current state.",
            Self::ScriptRunning => "A script is still running.",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dispatch {
    pub kind: ScriptKind,
    /// No script had run since startup.
    pub first_run: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Hold(Hold),
    CoolDown { until: Instant },
    Dispatch(Dispatch),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Watching,
    CoolingDown { until: Instant },
    Running(ScriptKind),
}

/// Aggregate and script state read together.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub aggregate: AggregateState,
    pub scripts: ScriptExecutionState,
}

/// One tick's decision, guards evaluated in order.
pub fn decide(snapshot: &Snapshot, now: Instant, policy: &SchedulerPolicy) -> Decision {
    let Snapshot { aggregate, scripts } = snapshot;

    if !aggregate.observed_event {
        return Decision::Hold(Hold::NoEventYet);
    }
    if !aggregate.settled(now, policy.debounce) {
        return Decision::Hold(Hold::Debouncing);
    }
    if scripts.ran_for(ScriptKind::for_state(aggregate.any_online)) {
        return Decision::Hold(Hold::AlreadyHandled);
    }
    if scripts.in_flight {
        return Decision::Hold(Hold::ScriptRunning);
    }
    if let Some(last) = scripts.last_run_at {
        let ready_at = last + policy.cooldown;
        if now < ready_at {
            return Decision::CoolDown { until: ready_at };
        }
    }

    dispatch_for(snapshot).map_or(Decision::Hold(Hold::AlreadyHandled), Decision::Dispatch)
}

/// Which script, if any, the current state calls for.
///
/// Before anything has run the matching script always runs; afterwards only
/// a script that has not yet run for this state does.
pub fn dispatch_for(snapshot: &Snapshot) -> Option<Dispatch> {
    let kind = ScriptKind::for_state(snapshot.aggregate.any_online);
    if snapshot.scripts.nothing_ran() {
        return Some(Dispatch {
            kind,
            first_run: true,
        });
    }
    (!snapshot.scripts.ran_for(kind)).then_some(Dispatch {
        kind,
        first_run: false,
    })
}

/// The single consumer of the aggregate. Never runs concurrently with
/// itself; a script run or a cooldown wait blocks only this loop.
pub struct Scheduler {
    ctx: Arc<WatchContext>,
    runner: Arc<ScriptRunner>,
    policy: SchedulerPolicy,
    phase: Phase,
}

impl Scheduler {
    pub fn new(ctx: Arc<WatchContext>, runner: Arc<ScriptRunner>, policy: SchedulerPolicy) -> Self {
        Self {
            ctx,
            runner,
            policy,
            phase: Phase::Watching,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Read the aggregate and script state under the aggregate lock so the
    /// pair is consistent.
    pub fn snapshot(&self) -> Snapshot {
        let aggregate = self.ctx.tracker().read();
        Snapshot {
            aggregate: *aggregate,
            scripts: self.runner.state(),
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        let mut interval = time::interval(self.policy.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(
            tick_ms = self.policy.tick.as_millis(),
            cooldown_s = self.policy.cooldown.as_secs(),
            "scheduler started"
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            if !self.tick(&cancel).await {
                break;
            }
        }

        tracing::debug!("scheduler stopped");
    }

    /// Evaluate once. A pending cooldown is waited out here, followed by
    /// exactly one re-evaluation. Returns `false` if cancelled while waiting.
    pub async fn tick(&mut self, cancel: &CancellationToken) -> bool {
        let now = Instant::now();
        match decide(&self.snapshot(), now, &self.policy) {
            Decision::Hold(hold) => self.ctx.quiet_log().debug(hold.message()),
            Decision::Dispatch(dispatch) => self.dispatch(dispatch).await,
            Decision::CoolDown { until } => {
                self.phase = Phase::CoolingDown { until };
                tracing::debug!("Waiting {:?} to run script.", until - now);

                tokio::select! {
                    () = cancel.cancelled() => {
                        self.phase = Phase::Watching;
                        return false;
                    }
                    () = time::sleep_until(until) => {}
                }
                self.phase = Phase::Watching;

                match dispatch_for(&self.snapshot()) {
                    Some(dispatch) => self.dispatch(dispatch).await,
                    None => self
                        .ctx
                        .quiet_log()
                        .debug("State returned to the handled one during cooldown."),
                }
            }
        }
        true
    }

    async fn dispatch(&mut self, dispatch: Dispatch) {
        let Dispatch { kind, first_run } = dispatch;
        if first_run {
            tracing::debug!("Running {kind} script for first run.");
        } else {
            tracing::debug!("Running {kind} script.");
        }

        self.phase = Phase::Running(kind);
        self.runner.run(kind).await;
        self.phase = Phase::Watching;
    }
}
