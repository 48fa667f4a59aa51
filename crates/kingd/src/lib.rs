//! Boot-and-supervision core of the king daemon.
//!
//! The daemon brings up a pier from one of several starting conditions:
//! minting a comet, booting an attested identity, booting a fake identity
//! for testing, or resuming existing durable state. It then supervises the
//! pier for the rest of the process lifetime, arbitrating shutdown,
//! interrupts, terminal resizes and aborts delivered as signals.
//!
//! Everything runs on one thread. [`King::run`] initialises the bootstrap
//! interpreter, installs the [`SignalRegistry`], and schedules the first
//! [`Command`] on a zero-delay timer so it always runs after signal handling
//! is in place. Boot commands flow through [`resolve_boot`], which consumes
//! an acquired pill (see [`acquire_pill`]) and, for attested boots, a seed
//! validated by [`decode_seed`].
//!
//! Boot is all-or-nothing and nothing is retried. Every failure surfaces as
//! a [`KingError`] at the run boundary, where the binary logs it and exits
//! with a failure status.

mod boot;
mod boothack;
mod bootstrap;
mod certs;
mod collaborators;
mod command;
mod errors;
mod event_loop;
mod health;
mod identity;
mod king;
mod pill;
mod placeholder;
mod seed;
mod signals;
mod slog;
mod telemetry;

pub use boot::{BootError, resolve_boot};
pub use boothack::build_command;
pub use bootstrap::{ConfigLoader, SystemConfigLoader, run_daemon, run_daemon_with};
pub use certs::{CertificateError, TransientCertificates};
pub use collaborators::{
    AttestError, Attestation, Attestor, BootDescriptor, BootRequest, LiteBootError, LiteRuntime,
    PierError, PierManager, Terminal,
};
pub use command::{
    BootCommand, BootProcedure, Command, CompletePill, CredentialSet, Event, IncompletePill,
    PillSpec, ProtocolError, SeededFile, decode_command,
};
pub use errors::{KingError, KingExit};
pub use event_loop::{EventLoop, LoopExit, LoopHandler, OneShotTimer, TimerTask, Turn};
pub use health::{LifecycleReporter, StructuredLifecycleReporter};
pub use identity::{Identity, IdentityError, Rank};
pub use king::{
    EMBEDDED_IMAGE, King, KingDeps, format_memory, mass_report_name, mass_report_stamp,
};
pub use pill::{
    FetchError, GIT_PILL_URL_BASE, GIT_PILL_URL_SUFFIX, HASH_TOKEN_LEN, HttpFetcher, PillError,
    PillFetcher, ShellError, ShellRunner, SystemShell, acquire_pill, pill_url,
};
pub use seed::{KeyMaterial, Seed, SeedError, decode_seed};
pub use signals::{
    SignalControl, SignalError, SignalKind, SignalRegistry, SignalSubscription, SubscriptionState,
};
pub use slog::{Slog, SlogGuard};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
