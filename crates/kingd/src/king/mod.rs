//! The daemon lifecycle: bring-up, the event loop, and teardown.
//!
//! [`King::run`] boots the bootstrap interpreter, installs the signal
//! registry, and schedules the boot command on a zero-delay timer so it only
//! runs once signal handling is in place. The loop then runs until the pier
//! has no more work. Teardown removes the trust-anchor file, disposes the
//! signal registry and closes the terminal log session. A quit skips it.

mod dispatch;
mod grab;

use std::borrow::Cow;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{SigHandler, Signal, signal};

use king_config::{Config, RuntimeFlags};

use crate::boothack::build_command;
use crate::certs::TransientCertificates;
use crate::collaborators::{Attestor, LiteRuntime, PierManager, Terminal};
use crate::errors::{KingError, KingExit};
use crate::event_loop::{EventLoop, LoopExit, LoopHandler, TimerTask, Turn};
use crate::health::LifecycleReporter;
use crate::pill::{PillFetcher, ShellRunner};
use crate::signals::{SignalControl, SignalKind, SignalRegistry};
use crate::slog::Slog;

pub use grab::{format_memory, mass_report_name, mass_report_stamp};

pub(crate) const KING_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::king");

/// Bootstrap interpreter image compiled into the daemon.
pub const EMBEDDED_IMAGE: &[u8] = include_bytes!("../../assets/ivory.pill");

/// Collaborators the daemon drives.
pub struct KingDeps {
    /// Owner of the instance.
    pub pier: Box<dyn PierManager>,
    /// Terminal output layer.
    pub terminal: Box<dyn Terminal>,
    /// Bootstrap interpreter.
    pub lite: Box<dyn LiteRuntime>,
    /// Identity derivation and attestation.
    pub attestor: Box<dyn Attestor>,
    /// HTTP download primitive.
    pub fetcher: Box<dyn PillFetcher>,
    /// Shell capture primitive.
    pub shell: Box<dyn ShellRunner>,
    /// Lifecycle observer.
    pub reporter: Arc<dyn LifecycleReporter>,
}

/// Process context for one daemon run.
pub struct King {
    config: Config,
    deps: KingDeps,
    signals: SignalControl,
    slog: Slog,
    flags: RuntimeFlags,
    certificates: Option<TransientCertificates>,
    session_open: bool,
}

impl King {
    /// Prepares a run. `certificates` is removed during teardown.
    #[must_use]
    pub fn new(
        config: Config,
        deps: KingDeps,
        certificates: Option<TransientCertificates>,
    ) -> Self {
        let flags = config.runtime_flags();
        Self {
            config,
            deps,
            signals: SignalControl::new(),
            slog: Slog::new(),
            flags,
            certificates,
            session_open: false,
        }
    }

    /// Runs the daemon until the loop drains or a quit request arrives.
    ///
    /// A drained loop is torn down. On failure teardown runs and the pier is
    /// told to bail. A quit leaves everything in place for the caller to
    /// abort the process.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error of the run.
    pub fn run(&mut self) -> Result<KingExit, KingError> {
        let outcome = self.run_loop();
        self.finish(outcome)
    }

    pub(crate) fn finish(
        &mut self,
        outcome: Result<KingExit, KingError>,
    ) -> Result<KingExit, KingError> {
        match outcome {
            Ok(KingExit::Aborted) => {
                tracing::debug!(target: KING_TARGET, "teardown skipped after quit");
                Ok(KingExit::Aborted)
            }
            Ok(KingExit::Drained) => {
                self.loop_exit();
                Ok(KingExit::Drained)
            }
            Err(error) => {
                self.deps.reporter.fatal(&error);
                self.bail();
                Err(error)
            }
        }
    }

    fn run_loop(&mut self) -> Result<KingExit, KingError> {
        self.deps.pier.install_signal_control(self.signals.clone());

        let lite_flags = self.flags | RuntimeFlags::HASHLESS;
        ignore_broken_pipe()?;
        let image = self.bootstrap_image()?;
        self.deps.lite.boot(lite_flags, &image)?;
        self.deps.reporter.lite_booted(lite_flags);

        let mut event_loop = EventLoop::new(self.config.loop_tick());
        self.loop_init(&mut event_loop)?;
        let signals = self.signals.clone();
        let exit = event_loop.run(self, &signals)?;
        self.deps.reporter.loop_exited();

        Ok(match exit {
            LoopExit::Drained => KingExit::Drained,
            LoopExit::Aborted => KingExit::Aborted,
        })
    }

    fn bootstrap_image(&self) -> Result<Cow<'static, [u8]>, KingError> {
        self.config.lite_pill.as_deref().map_or(
            Ok(Cow::Borrowed(EMBEDDED_IMAGE)),
            |path| {
                fs::read(path)
                    .map(Cow::Owned)
                    .map_err(|source| KingError::BootstrapImage {
                        path: path.to_path_buf(),
                        source,
                    })
            },
        )
    }

    fn loop_init(&mut self, event_loop: &mut EventLoop) -> Result<(), KingError> {
        self.deps.terminal.open_log_session();
        self.session_open = true;

        let mut registry = SignalRegistry::new()?;
        registry.start()?;
        self.signals.install(registry);

        event_loop.timer().start(Duration::ZERO, TimerTask::BootHack);
        Ok(())
    }

    /// Exit-phase cleanup. Safe to call more than once.
    fn loop_exit(&mut self) {
        if let Some(certificates) = self.certificates.take() {
            certificates.remove();
        }
        let released = self.signals.dispose();
        if self.session_open {
            self.deps.terminal.close_log_session();
            self.session_open = false;
        }
        tracing::debug!(target: KING_TARGET, released, "daemon torn down");
    }

    /// Immediate, non-orderly shutdown: cleanup, then the pier bails.
    pub fn bail(&mut self) {
        self.loop_exit();
        self.deps.pier.bail();
    }

    /// Bails and terminates the process with a failure status.
    pub fn bail_and_exit(&mut self) -> ! {
        self.bail();
        std::process::exit(1)
    }

    /// Handles a raw signal number, logging numbers the daemon does not
    /// subscribe to.
    pub fn handle_signal_number(&mut self, number: i32) -> Turn {
        SignalKind::from_number(number).map_or_else(
            || {
                tracing::warn!(target: KING_TARGET, signal = number, "mysterious signal {number}");
                Turn::Continue
            },
            |kind| self.on_signal(kind),
        )
    }

    /// Shared signal controller.
    #[must_use]
    pub const fn signals(&self) -> &SignalControl {
        &self.signals
    }

    /// Diagnostic sink used during attested boot.
    #[must_use]
    pub const fn slog(&self) -> &Slog {
        &self.slog
    }
}

fn ignore_broken_pipe() -> Result<(), KingError> {
    // SAFETY: SIG_IGN runs no code in signal context.
    unsafe { signal(Signal::SIGPIPE, SigHandler::SigIgn) }
        .map(drop)
        .map_err(|source| KingError::BrokenPipe { source })
}

impl LoopHandler for King {
    fn on_timer(&mut self, task: TimerTask) -> Result<(), KingError> {
        match task {
            TimerTask::BootHack => {
                let command =
                    build_command(&self.config, &*self.deps.fetcher, &*self.deps.shell)?;
                self.dispatch(command)
            }
        }
    }

    fn on_signal(&mut self, signal: SignalKind) -> Turn {
        self.deps.reporter.signal_received(signal);
        match signal {
            SignalKind::Terminate => {
                self.deps.pier.request_exit();
                Turn::Continue
            }
            SignalKind::Interrupt => {
                self.deps.terminal.emit("interrupt");
                self.deps.terminal.forward_interrupt();
                Turn::Continue
            }
            SignalKind::Resize => {
                self.deps.terminal.notify_resize();
                Turn::Continue
            }
            SignalKind::Quit => {
                tracing::error!(target: KING_TARGET, "quit requested; aborting");
                Turn::Abort
            }
        }
    }

    fn has_pending_work(&self) -> bool {
        self.deps.pier.is_live()
    }
}
