//! Boundaries to the subsystems the daemon drives but does not implement.
//!
//! The pier manager, terminal layer, bootstrap interpreter and attestation
//! primitives live outside this crate. The daemon only hands them arguments
//! and lifecycle requests through these traits.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use king_config::RuntimeFlags;

use crate::command::CompletePill;
use crate::identity::Identity;
use crate::seed::Seed;
use crate::signals::SignalControl;
use crate::slog::Slog;

/// Normalised arguments handed to [`PierManager::boot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootRequest {
    /// Runtime flags as configured, without daemon-only additions.
    pub flags: RuntimeFlags,
    /// Identity the pier boots as.
    pub identity: Identity,
    /// How the identity was established.
    pub descriptor: BootDescriptor,
    /// Pill the pier is created from.
    pub pill: CompletePill,
    /// Pier directory.
    pub pier: Utf8PathBuf,
}

/// Boot descriptor passed to the pier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootDescriptor {
    /// Synthetic, unsigned boot.
    Fake {
        /// Identity to boot as.
        identity: Identity,
    },
    /// Attested boot.
    Dawn(Attestation),
}

/// Output of attested-boot derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    /// Serialized initial event proving ownership of the identity.
    pub event: Vec<u8>,
}

/// Failure reported by the pier manager.
#[derive(Debug, Error)]
#[error("pier {operation} failed: {message}")]
pub struct PierError {
    /// Operation that failed.
    pub operation: &'static str,
    /// Description of the failure.
    pub message: String,
}

impl PierError {
    /// Builds an error for `operation`.
    #[must_use]
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

/// Failure initialising the bootstrap interpreter.
#[derive(Debug, Error)]
#[error("lite: boot failed: {message}")]
pub struct LiteBootError {
    /// Description of the failure.
    pub message: String,
}

/// Failure deriving an identity or attestation.
#[derive(Debug, Error)]
#[error("{operation}: {message}")]
pub struct AttestError {
    /// Operation that failed.
    pub operation: &'static str,
    /// Description of the failure.
    pub message: String,
}

/// Owner of the instance once boot arguments are resolved.
pub trait PierManager {
    /// Registers the signal controller so pier-level pauses can stop and
    /// restart signal delivery.
    fn install_signal_control(&mut self, control: SignalControl);

    /// Creates and boots a new pier.
    ///
    /// # Errors
    ///
    /// Fails when the pier cannot be created or rejects the boot event.
    fn boot(&mut self, request: BootRequest) -> Result<(), PierError>;

    /// Resumes an existing pier.
    ///
    /// # Errors
    ///
    /// Fails when no pier exists at `path` or it cannot be restarted.
    fn resume(&mut self, flags: RuntimeFlags, path: &Utf8Path) -> Result<(), PierError>;

    /// Begins orderly shutdown of the active pier.
    fn request_exit(&mut self);

    /// Abandons the active pier without orderly shutdown.
    fn bail(&mut self);

    /// Writes a memory report for the pier to `sink`, returning the bytes
    /// accounted for.
    ///
    /// # Errors
    ///
    /// Propagates write failures on `sink`.
    fn mark(&mut self, sink: &mut dyn Write) -> io::Result<u64>;

    /// Pier directory of the active instance, if any.
    fn active_pier(&self) -> Option<&Utf8Path>;

    /// Whether the pier still has work keeping the loop alive.
    fn is_live(&self) -> bool;
}

/// Terminal output layer.
pub trait Terminal {
    /// Begins a log session for the lifetime of the loop.
    fn open_log_session(&mut self);

    /// Ends the log session.
    fn close_log_session(&mut self);

    /// Writes a diagnostic line.
    fn emit(&mut self, line: &str);

    /// Forwards an interrupt toward the subordinate process.
    fn forward_interrupt(&mut self);

    /// Re-reads terminal dimensions.
    fn notify_resize(&mut self);

    /// Runs `write` against the terminal's report sink.
    ///
    /// # Errors
    ///
    /// Propagates the failure of `write`.
    fn report(&mut self, write: &mut dyn FnMut(&mut dyn Write) -> io::Result<()>)
    -> io::Result<()>;
}

/// Lightweight interpreter used before any pier exists.
pub trait LiteRuntime {
    /// Boots the interpreter from `image` with `flags`.
    ///
    /// # Errors
    ///
    /// Fails when the image is rejected.
    fn boot(&mut self, flags: RuntimeFlags, image: &[u8]) -> Result<(), LiteBootError>;

    /// Bytes currently marked live.
    fn mark(&mut self) -> u64;

    /// Frees unmarked memory, returning the bytes swept.
    fn sweep(&mut self) -> u64;
}

/// Opaque cryptographic derivations used by attested boot.
pub trait Attestor {
    /// Mints a fresh comet seed, optionally under `parent`.
    ///
    /// # Errors
    ///
    /// Fails when no seed can be derived.
    fn mine_comet(&mut self, parent: Option<&Identity>) -> Result<Seed, AttestError>;

    /// Derives the attested boot event for `seed`. Diagnostics go to `slog`.
    ///
    /// # Errors
    ///
    /// Fails when the seed cannot be attested.
    fn attest(&mut self, seed: Seed, slog: &Slog) -> Result<Attestation, AttestError>;
}
