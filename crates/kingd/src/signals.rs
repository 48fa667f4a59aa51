//! Process signal subscriptions and their lifecycle.
//!
//! The registry owns one subscription for each of termination, interrupt,
//! terminal resize and quit. Subscriptions cycle between started and stopped
//! while the pier pauses and resumes delivery, and are disposed exactly once
//! at teardown. Delivery is recorded in atomic flags and a wake socket so
//! the event loop can block until a signal or its tick elapses.

use std::cell::RefCell;
use std::fmt;
use std::io::{self, ErrorKind, Read};
use std::os::unix::net::UnixStream;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use signal_hook::SigId;
use signal_hook::consts::signal::{SIGINT, SIGQUIT, SIGTERM, SIGWINCH};
use signal_hook::low_level;
use thiserror::Error;

const SIGNALS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::signals");

/// Signals the daemon subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// Orderly shutdown request.
    Terminate,
    /// Keyboard interrupt.
    Interrupt,
    /// Terminal dimensions changed.
    Resize,
    /// Immediate abort request.
    Quit,
}

impl SignalKind {
    /// Every subscribed signal, in registration order.
    pub const ALL: [Self; 4] = [Self::Terminate, Self::Interrupt, Self::Resize, Self::Quit];

    /// Platform signal number.
    #[must_use]
    pub const fn number(self) -> i32 {
        match self {
            Self::Terminate => SIGTERM,
            Self::Interrupt => SIGINT,
            Self::Resize => SIGWINCH,
            Self::Quit => SIGQUIT,
        }
    }

    /// Maps a platform signal number back to a subscribed kind.
    #[must_use]
    pub const fn from_number(number: i32) -> Option<Self> {
        match number {
            SIGTERM => Some(Self::Terminate),
            SIGINT => Some(Self::Interrupt),
            SIGWINCH => Some(Self::Resize),
            SIGQUIT => Some(Self::Quit),
            _ => None,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Terminate => "SIGTERM",
            Self::Interrupt => "SIGINT",
            Self::Resize => "SIGWINCH",
            Self::Quit => "SIGQUIT",
        };
        formatter.write_str(name)
    }
}

/// Failures managing signal subscriptions.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Installing an OS handler failed.
    #[error("failed to subscribe to {signal}: {source}")]
    Register {
        /// Signal being subscribed.
        signal: SignalKind,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A subscription was started twice without a stop.
    #[error("subscription for {0} is already started")]
    AlreadyStarted(SignalKind),
    /// The wake socket failed.
    #[error("signal wake socket failed: {source}")]
    Wake {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Lifecycle position of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Created but never started.
    Created,
    /// Delivering signals.
    Started,
    /// Delivery stopped; may be started again.
    Stopped,
}

/// One OS signal subscription.
#[derive(Debug)]
pub struct SignalSubscription {
    kind: SignalKind,
    pending: Arc<AtomicBool>,
    handlers: Option<[SigId; 2]>,
    state: SubscriptionState,
}

impl SignalSubscription {
    fn new(kind: SignalKind) -> Self {
        Self {
            kind,
            pending: Arc::new(AtomicBool::new(false)),
            handlers: None,
            state: SubscriptionState::Created,
        }
    }

    /// Signal this subscription watches.
    #[must_use]
    pub const fn kind(&self) -> SignalKind {
        self.kind
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SubscriptionState {
        self.state
    }

    fn start(&mut self, wake: &UnixStream) -> Result<(), SignalError> {
        if self.state == SubscriptionState::Started {
            return Err(SignalError::AlreadyStarted(self.kind));
        }
        let register_error = |source| SignalError::Register {
            signal: self.kind,
            source,
        };
        let number = self.kind.number();
        let flag = signal_hook::flag::register(number, Arc::clone(&self.pending))
            .map_err(register_error)?;
        let registered = wake.try_clone().map_err(register_error).and_then(|notifier| {
            low_level::pipe::register(number, notifier).map_err(register_error)
        });
        let pipe = match registered {
            Ok(pipe) => pipe,
            Err(error) => {
                low_level::unregister(flag);
                return Err(error);
            }
        };
        self.handlers = Some([flag, pipe]);
        self.state = SubscriptionState::Started;
        Ok(())
    }

    /// Stops delivery. Safe to call on a subscription that never started.
    fn stop(&mut self) {
        if let Some(handlers) = self.handlers.take() {
            for handler in handlers {
                low_level::unregister(handler);
            }
            self.state = SubscriptionState::Stopped;
        }
    }

    fn take_pending(&self) -> bool {
        self.pending.swap(false, Ordering::SeqCst)
    }
}

impl Drop for SignalSubscription {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The daemon's fixed set of signal subscriptions.
#[derive(Debug)]
pub struct SignalRegistry {
    subscriptions: Vec<SignalSubscription>,
    notifier: UnixStream,
    receiver: UnixStream,
}

impl SignalRegistry {
    /// Creates one subscription per [`SignalKind`], none started.
    ///
    /// # Errors
    ///
    /// Fails when the wake socket cannot be created.
    pub fn new() -> Result<Self, SignalError> {
        let (notifier, receiver) =
            UnixStream::pair().map_err(|source| SignalError::Wake { source })?;
        Ok(Self {
            subscriptions: SignalKind::ALL
                .into_iter()
                .map(SignalSubscription::new)
                .collect(),
            notifier,
            receiver,
        })
    }

    /// Starts every subscription that is not already started.
    ///
    /// # Errors
    ///
    /// Fails when an OS handler cannot be installed.
    pub fn start(&mut self) -> Result<(), SignalError> {
        for subscription in &mut self.subscriptions {
            if subscription.state() != SubscriptionState::Started {
                subscription.start(&self.notifier)?;
            }
        }
        tracing::debug!(target: SIGNALS_TARGET, "signal subscriptions started");
        Ok(())
    }

    /// Stops every subscription. Never-started subscriptions are skipped.
    pub fn stop(&mut self) {
        for subscription in &mut self.subscriptions {
            subscription.stop();
        }
        tracing::debug!(target: SIGNALS_TARGET, "signal subscriptions stopped");
    }

    /// Whether every subscription is delivering signals.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.subscriptions
            .iter()
            .all(|subscription| subscription.state() == SubscriptionState::Started)
    }

    /// Lifecycle state of each subscription, in registration order.
    #[must_use]
    pub fn states(&self) -> Vec<(SignalKind, SubscriptionState)> {
        self.subscriptions
            .iter()
            .map(|subscription| (subscription.kind(), subscription.state()))
            .collect()
    }

    /// Returns and clears the signals delivered since the last call.
    #[must_use]
    pub fn take_pending(&self) -> Vec<SignalKind> {
        self.subscriptions
            .iter()
            .filter(|subscription| subscription.take_pending())
            .map(SignalSubscription::kind)
            .collect()
    }

    /// Blocks until a signal is delivered or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Fails when the wake socket cannot be read.
    pub fn wait(&mut self, timeout: Duration) -> Result<(), SignalError> {
        let wake_error = |source| SignalError::Wake { source };
        if timeout.is_zero() {
            return self.drain_wake().map_err(wake_error);
        }
        self.receiver
            .set_read_timeout(Some(timeout))
            .map_err(wake_error)?;
        let mut byte = [0u8; 1];
        match self.receiver.read(&mut byte) {
            Ok(_) => self.drain_wake().map_err(wake_error),
            Err(error)
                if matches!(
                    error.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Ok(())
            }
            Err(source) => Err(wake_error(source)),
        }
    }

    fn drain_wake(&mut self) -> io::Result<()> {
        self.receiver.set_nonblocking(true)?;
        let mut buffer = [0u8; 64];
        let drained = loop {
            match self.receiver.read(&mut buffer) {
                Ok(0) => break Ok(()),
                Ok(_) => {}
                Err(error) if error.kind() == ErrorKind::WouldBlock => break Ok(()),
                Err(error) if error.kind() == ErrorKind::Interrupted => {}
                Err(error) => break Err(error),
            }
        };
        self.receiver.set_nonblocking(false)?;
        drained
    }

    /// Stops and releases every subscription, returning how many were
    /// released.
    pub fn dispose(mut self) -> usize {
        self.stop();
        let released = self.subscriptions.len();
        self.subscriptions.clear();
        tracing::debug!(target: SIGNALS_TARGET, released, "signal subscriptions disposed");
        released
    }
}

/// Shared handle to the installed registry.
///
/// The pier manager holds a clone so it can stop and restart delivery
/// across its own pauses. After [`SignalControl::dispose`] every operation
/// is a no-op.
#[derive(Debug, Clone, Default)]
pub struct SignalControl {
    registry: Rc<RefCell<Option<SignalRegistry>>>,
}

impl SignalControl {
    /// Creates a control with no registry installed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `registry`, releasing any previously installed one.
    pub fn install(&self, registry: SignalRegistry) {
        if let Some(previous) = self.registry.borrow_mut().replace(registry) {
            previous.dispose();
        }
    }

    /// Pauses signal delivery.
    pub fn hold(&self) {
        if let Some(registry) = self.registry.borrow_mut().as_mut() {
            registry.stop();
        }
    }

    /// Resumes signal delivery.
    ///
    /// # Errors
    ///
    /// Fails when an OS handler cannot be installed.
    pub fn resume(&self) -> Result<(), SignalError> {
        self.registry
            .borrow_mut()
            .as_mut()
            .map_or(Ok(()), SignalRegistry::start)
    }

    /// Whether a registry is installed and delivering.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.registry
            .borrow()
            .as_ref()
            .is_some_and(SignalRegistry::is_started)
    }

    /// Returns and clears delivered signals.
    #[must_use]
    pub fn take_pending(&self) -> Vec<SignalKind> {
        self.registry
            .borrow()
            .as_ref()
            .map(SignalRegistry::take_pending)
            .unwrap_or_default()
    }

    /// Blocks until a signal arrives or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Fails when the wake socket cannot be read.
    pub fn wait(&self, timeout: Duration) -> Result<(), SignalError> {
        self.registry.borrow_mut().as_mut().map_or_else(
            || {
                std::thread::sleep(timeout);
                Ok(())
            },
            |registry| registry.wait(timeout),
        )
    }

    /// Disposes the installed registry. Returns the number of subscriptions
    /// released, zero when nothing was installed.
    pub fn dispose(&self) -> usize {
        self.registry
            .borrow_mut()
            .take()
            .map_or(0, SignalRegistry::dispose)
    }
}

/// Serialises tests that raise real signals. Handlers are process-wide, so
/// a raise in one test is visible to every started registry.
#[cfg(test)]
pub(crate) static RAISE_LOCK: once_cell::sync::Lazy<std::sync::Mutex<()>> =
    once_cell::sync::Lazy::new(|| std::sync::Mutex::new(()));
