//! Structured reporting of daemon lifecycle milestones.

use std::sync::Arc;

use camino::Utf8Path;

use king_config::RuntimeFlags;

use crate::errors::KingError;
use crate::identity::Identity;
use crate::signals::SignalKind;

/// Observer surfacing lifecycle events to telemetry sinks.
pub trait LifecycleReporter: Send + Sync {
    /// The bootstrap interpreter started.
    fn lite_booted(&self, flags: RuntimeFlags);

    /// A command is about to be dispatched.
    fn command_dispatched(&self, tag: &'static str);

    /// A pill was acquired.
    fn pill_acquired(&self, bytes: usize);

    /// A new pier boot was handed to the pier manager.
    fn boot_requested(&self, identity: &Identity);

    /// An existing pier is being resumed.
    fn pier_resumed(&self, path: &Utf8Path);

    /// A subscribed signal was delivered.
    fn signal_received(&self, signal: SignalKind);

    /// The event loop returned.
    fn loop_exited(&self);

    /// The run is ending with a fatal error.
    fn fatal(&self, error: &KingError);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter + ?Sized,
{
    fn lite_booted(&self, flags: RuntimeFlags) {
        (**self).lite_booted(flags);
    }

    fn command_dispatched(&self, tag: &'static str) {
        (**self).command_dispatched(tag);
    }

    fn pill_acquired(&self, bytes: usize) {
        (**self).pill_acquired(bytes);
    }

    fn boot_requested(&self, identity: &Identity) {
        (**self).boot_requested(identity);
    }

    fn pier_resumed(&self, path: &Utf8Path) {
        (**self).pier_resumed(path);
    }

    fn signal_received(&self, signal: SignalKind) {
        (**self).signal_received(signal);
    }

    fn loop_exited(&self) {
        (**self).loop_exited();
    }

    fn fatal(&self, error: &KingError) {
        (**self).fatal(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn lite_booted(&self, flags: RuntimeFlags) {
        tracing::info!(
            target: "kingd::health",
            event = "lite_booted",
            flags = %flags,
            "bootstrap interpreter ready"
        );
    }

    fn command_dispatched(&self, tag: &'static str) {
        tracing::info!(
            target: "kingd::health",
            event = "command_dispatched",
            command = tag,
            "dispatching command"
        );
    }

    fn pill_acquired(&self, bytes: usize) {
        tracing::info!(
            target: "kingd::health",
            event = "pill_acquired",
            bytes,
            "pill acquired"
        );
    }

    fn boot_requested(&self, identity: &Identity) {
        tracing::info!(
            target: "kingd::health",
            event = "boot_requested",
            ship = %identity,
            "booting pier"
        );
    }

    fn pier_resumed(&self, path: &Utf8Path) {
        tracing::info!(
            target: "kingd::health",
            event = "pier_resumed",
            pier = %path,
            "resuming pier"
        );
    }

    fn signal_received(&self, signal: SignalKind) {
        tracing::debug!(
            target: "kingd::health",
            event = "signal_received",
            signal = %signal,
            "signal received"
        );
    }

    fn loop_exited(&self) {
        tracing::info!(
            target: "kingd::health",
            event = "loop_exited",
            "event loop finished"
        );
    }

    fn fatal(&self, error: &KingError) {
        tracing::error!(
            target: "kingd::health",
            event = "fatal",
            error = %error,
            "daemon failed"
        );
    }
}
