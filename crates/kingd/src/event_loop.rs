//! Single-threaded cooperative loop driving timers and signal delivery.

use std::time::{Duration, Instant};

use crate::errors::KingError;
use crate::signals::{SignalControl, SignalKind};

const LOOP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::loop");

/// Deferred actions the loop can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    /// Build and dispatch the first command.
    BootHack,
}

/// One-shot timer. Firing disarms it.
#[derive(Debug, Default)]
pub struct OneShotTimer {
    armed: Option<(Instant, TimerTask)>,
}

impl OneShotTimer {
    /// Creates a disarmed timer.
    #[must_use]
    pub const fn new() -> Self {
        Self { armed: None }
    }

    /// Arms the timer to fire `task` after `delay`, replacing any earlier
    /// schedule.
    pub fn start(&mut self, delay: Duration, task: TimerTask) {
        self.armed = Some((Instant::now() + delay, task));
    }

    /// Disarms the timer.
    pub const fn stop(&mut self) {
        self.armed = None;
    }

    /// Whether a task is scheduled.
    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Takes the scheduled task if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<TimerTask> {
        match self.armed {
            Some((deadline, task)) if deadline <= now => {
                self.armed = None;
                Some(task)
            }
            _ => None,
        }
    }

    /// Time until the scheduled task is due.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.armed
            .map(|(deadline, _)| deadline.saturating_duration_since(now))
    }
}

/// Whether the loop should keep running after a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// Keep running.
    Continue,
    /// Leave the loop immediately and abort the process.
    Abort,
}

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// No pending work remained.
    Drained,
    /// A handler requested an abort.
    Aborted,
}

/// Callbacks invoked by [`EventLoop::run`].
pub trait LoopHandler {
    /// Runs a due timer task.
    fn on_timer(&mut self, task: TimerTask) -> Result<(), KingError>;

    /// Handles a delivered signal.
    fn on_signal(&mut self, signal: SignalKind) -> Turn;

    /// Whether work outside the loop's own timer keeps it alive.
    fn has_pending_work(&self) -> bool;
}

/// The daemon's event loop.
#[derive(Debug)]
pub struct EventLoop {
    timer: OneShotTimer,
    tick: Duration,
}

impl EventLoop {
    /// Creates a loop whose blocking waits never exceed `tick`.
    #[must_use]
    pub const fn new(tick: Duration) -> Self {
        Self {
            timer: OneShotTimer::new(),
            tick,
        }
    }

    /// The loop's one-shot timer.
    pub const fn timer(&mut self) -> &mut OneShotTimer {
        &mut self.timer
    }

    /// Runs until no work is pending or a handler aborts.
    ///
    /// Each turn delivers pending signals first, then fires the timer if it
    /// is due, then blocks on signal delivery until the timer deadline or
    /// the tick elapses.
    ///
    /// # Errors
    ///
    /// Propagates timer task failures and signal wait failures.
    pub fn run(
        &mut self,
        handler: &mut dyn LoopHandler,
        signals: &SignalControl,
    ) -> Result<LoopExit, KingError> {
        tracing::debug!(target: LOOP_TARGET, tick_ms = self.tick.as_millis(), "loop starting");
        loop {
            for signal in signals.take_pending() {
                tracing::debug!(target: LOOP_TARGET, %signal, "signal delivered");
                if handler.on_signal(signal) == Turn::Abort {
                    return Ok(LoopExit::Aborted);
                }
            }

            if let Some(task) = self.timer.take_due(Instant::now()) {
                handler.on_timer(task)?;
                continue;
            }

            if !self.timer.is_armed() && !handler.has_pending_work() {
                tracing::debug!(target: LOOP_TARGET, "loop drained");
                return Ok(LoopExit::Drained);
            }

            let wait = self
                .timer
                .remaining(Instant::now())
                .map_or(self.tick, |remaining| remaining.min(self.tick));
            signals.wait(wait)?;
        }
    }
}
