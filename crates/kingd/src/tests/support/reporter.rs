//! Test double for [`LifecycleReporter`] that records events for assertions.

use std::sync::Mutex;

use camino::Utf8Path;

use king_config::RuntimeFlags;

use crate::errors::KingError;
use crate::health::LifecycleReporter;
use crate::identity::Identity;
use crate::signals::SignalKind;

/// Lifecycle events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The bootstrap interpreter booted with these flags.
    LiteBooted(RuntimeFlags),
    /// A command with this tag was dispatched.
    CommandDispatched(&'static str),
    /// A pill of this many bytes was acquired.
    PillAcquired(usize),
    /// A new pier boot was requested.
    BootRequested(Identity),
    /// An existing pier was resumed from this path.
    PierResumed(String),
    /// A signal reached the loop.
    SignalReceived(SignalKind),
    /// The event loop exited.
    LoopExited,
    /// A fatal error was reported.
    Fatal(String),
}

/// Records lifecycle events for assertions.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<LifecycleEvent>>,
}

impl RecordingReporter {
    /// Captures a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: LifecycleEvent) {
        self.events
            .lock()
            .expect("lifecycle reporter mutex poisoned")
            .push(event);
    }
}

impl LifecycleReporter for RecordingReporter {
    fn lite_booted(&self, flags: RuntimeFlags) {
        self.record(LifecycleEvent::LiteBooted(flags));
    }

    fn command_dispatched(&self, tag: &'static str) {
        self.record(LifecycleEvent::CommandDispatched(tag));
    }

    fn pill_acquired(&self, bytes: usize) {
        self.record(LifecycleEvent::PillAcquired(bytes));
    }

    fn boot_requested(&self, identity: &Identity) {
        self.record(LifecycleEvent::BootRequested(identity.clone()));
    }

    fn pier_resumed(&self, path: &Utf8Path) {
        self.record(LifecycleEvent::PierResumed(path.to_string()));
    }

    fn signal_received(&self, signal: SignalKind) {
        self.record(LifecycleEvent::SignalReceived(signal));
    }

    fn loop_exited(&self) {
        self.record(LifecycleEvent::LoopExited);
    }

    fn fatal(&self, error: &KingError) {
        self.record(LifecycleEvent::Fatal(error.to_string()));
    }
}
