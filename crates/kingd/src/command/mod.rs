//! Directives describing how an instance should be started or resumed.
//!
//! Every value here is move-only: resolution steps consume a command and
//! produce a new owned value, so nothing is read after it has been handed on.

mod event;
mod wire;

use std::collections::BTreeMap;

use camino::Utf8PathBuf;

use crate::identity::Identity;
use crate::seed::Seed;

pub use event::{Event, SeededFile};
pub use wire::{ProtocolError, decode_command};

/// A single directive for the daemon.
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Start a fresh pier.
    Boot(BootCommand),
    /// Terminate the daemon. Declared but rejected by dispatch.
    Exit,
    /// Resume an existing pier.
    AcquirePier {
        /// Pier directory to resume.
        path: Option<Utf8PathBuf>,
    },
    /// Administrative action on a ship. Declared but rejected by dispatch.
    RootAction {
        /// Ship the action targets.
        identity: Identity,
        /// Credentials authorising the action.
        credentials: CredentialSet,
    },
}

impl Command {
    /// Wire tag of the command.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Boot(_) => "boot",
            Self::Exit => "exit",
            Self::AcquirePier { .. } => "pier",
            Self::RootAction { .. } => "root",
        }
    }
}

/// Arguments for booting a fresh pier.
#[derive(Debug, PartialEq, Eq)]
pub struct BootCommand {
    /// How the identity is obtained.
    pub procedure: BootProcedure,
    /// Bootstrap bundle for the new instance.
    pub pill: PillSpec,
    /// Pier directory to create.
    pub pier: Utf8PathBuf,
}

/// How the booting identity is obtained.
#[derive(Debug, PartialEq, Eq)]
pub enum BootProcedure {
    /// Mint a fresh identity, optionally under a parent.
    Comet {
        /// Parent the comet should be issued under.
        parent: Option<Identity>,
    },
    /// Boot with an attested seed.
    Dawn {
        /// Validated seed.
        seed: Seed,
    },
    /// Boot a synthetic identity without attestation.
    Fake {
        /// Identity to boot as.
        identity: Identity,
    },
}

impl BootProcedure {
    /// Wire tag of the procedure.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Comet { .. } => "come",
            Self::Dawn { .. } => "dawn",
            Self::Fake { .. } => "fake",
        }
    }
}

/// Bootstrap bundle a pier is created from.
#[derive(Debug, PartialEq, Eq)]
pub enum PillSpec {
    /// A single pill image, optionally paired with a replacement event.
    Complete(CompletePill),
    /// A pill split into base image and event sequences. Not bootable here.
    Incomplete(IncompletePill),
}

/// Complete pill image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletePill {
    /// Raw pill bytes.
    pub payload: Vec<u8>,
    /// Event replacing the pill's own filesystem contents.
    pub override_event: Option<Event>,
}

/// Pill split into a base image plus ordered event sequences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncompletePill {
    /// Base image bytes.
    pub payload: Vec<u8>,
    /// Kernel module events, in order.
    pub module_events: Vec<Event>,
    /// Userspace events, in order.
    pub userspace_events: Vec<Event>,
}

/// Administrative credential set attached to a root action.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct CredentialSet {
    /// Software version string.
    pub version: String,
    /// Kernel component versions keyed by component name.
    #[serde(default)]
    pub kelvins: BTreeMap<String, u32>,
}
