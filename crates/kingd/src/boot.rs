//! Resolution of a boot procedure into pier boot arguments.

use camino::Utf8PathBuf;
use thiserror::Error;

use king_config::RuntimeFlags;

use crate::collaborators::{AttestError, Attestor, BootDescriptor, BootRequest};
use crate::command::{BootCommand, BootProcedure, PillSpec};
use crate::identity::{Identity, IdentityError};
use crate::seed::Seed;
use crate::slog::Slog;

const BOOT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::boot");

/// Failures resolving or constructing a boot.
#[derive(Debug, Error)]
pub enum BootError {
    /// The pill was supplied in split form.
    #[error("boot: incomplete pills are not supported")]
    IncompletePill,
    /// No pier directory was configured.
    #[error("boot: a pier path is required")]
    MissingPier,
    /// The fake identity did not parse.
    #[error("boot: malformed fake identity: {source}")]
    MalformedFake {
        /// Parse failure.
        #[source]
        source: IdentityError,
    },
    /// The expected identity did not parse.
    #[error("boot: malformed identity: {source}")]
    MalformedWho {
        /// Parse failure.
        #[source]
        source: IdentityError,
    },
    /// Attested boot was requested without a key.
    #[error("boot: must specify a key with a key file or a generated key")]
    MissingKey,
    /// The key file could not be read.
    #[error("boot: failed to read key file '{path}': {source}")]
    KeyRead {
        /// Key file.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Identity derivation or attestation failed.
    #[error(transparent)]
    Attest(#[from] AttestError),
}

/// Turns `command` into the arguments handed to the pier manager.
///
/// Fake boots never touch the attestor. Comets mint a seed and continue as
/// an attested boot. Attested boots run with a diagnostic sink installed on
/// `slog`, which is removed again whatever the outcome.
///
/// # Errors
///
/// Returns [`BootError::IncompletePill`] for split pills and
/// [`BootError::Attest`] when derivation fails.
pub fn resolve_boot(
    command: BootCommand,
    flags: RuntimeFlags,
    attestor: &mut dyn Attestor,
    slog: &Slog,
) -> Result<BootRequest, BootError> {
    let BootCommand {
        procedure,
        pill,
        pier,
    } = command;
    let PillSpec::Complete(pill) = pill else {
        return Err(BootError::IncompletePill);
    };

    let (identity, descriptor) = match procedure {
        BootProcedure::Fake { identity } => {
            tracing::info!(target: BOOT_TARGET, %identity, "boot: fake ship");
            let descriptor = BootDescriptor::Fake {
                identity: identity.clone(),
            };
            (identity, descriptor)
        }
        BootProcedure::Comet { parent } => {
            tracing::info!(target: BOOT_TARGET, "boot: mining a comet");
            let seed = attestor.mine_comet(parent.as_ref())?;
            dawn(seed, attestor, slog)?
        }
        BootProcedure::Dawn { seed } => dawn(seed, attestor, slog)?,
    };

    Ok(BootRequest {
        flags,
        identity,
        descriptor,
        pill,
        pier,
    })
}

fn dawn(
    seed: Seed,
    attestor: &mut dyn Attestor,
    slog: &Slog,
) -> Result<(Identity, BootDescriptor), BootError> {
    let identity = seed.identity().clone();
    tracing::info!(target: BOOT_TARGET, %identity, "boot: attesting ship");
    let _sink = slog.install(|line| tracing::info!(target: BOOT_TARGET, "{line}"));
    let attestation = attestor.attest(seed, slog)?;
    Ok((identity, BootDescriptor::Dawn(attestation)))
}
