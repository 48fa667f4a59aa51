//! Construction of the first command from host configuration.

use std::fs;

use king_config::{Config, KeySource};

use crate::boot::BootError;
use crate::command::{BootCommand, BootProcedure, Command};
use crate::errors::KingError;
use crate::identity::Identity;
use crate::pill::{PillFetcher, ShellRunner, acquire_pill};
use crate::seed::decode_seed;

const BOOTHACK_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::boothack");

/// Builds the directive the daemon runs once its loop is up.
///
/// Without `new_pier` the configured pier is resumed. Otherwise the
/// procedure is chosen from `fake`, then `who`, then a comet, and paired
/// with a freshly acquired pill.
///
/// # Errors
///
/// Fails when no pier is configured, an identity is malformed, the key is
/// missing or invalid, or pill acquisition fails.
pub fn build_command(
    config: &Config,
    fetcher: &dyn PillFetcher,
    shell: &dyn ShellRunner,
) -> Result<Command, KingError> {
    let pier = config
        .pier_path()
        .ok_or(BootError::MissingPier)?
        .to_path_buf();
    if !config.new_pier {
        return Ok(Command::AcquirePier { path: Some(pier) });
    }

    let procedure = boot_procedure(config)?;
    tracing::debug!(target: BOOTHACK_TARGET, procedure = procedure.tag(), %pier, "boot command");
    let pill = acquire_pill(config, fetcher, shell)?;
    Ok(Command::Boot(BootCommand {
        procedure,
        pill,
        pier,
    }))
}

fn boot_procedure(config: &Config) -> Result<BootProcedure, KingError> {
    if let Some(fake) = config.fake.as_deref() {
        let identity = fake
            .parse::<Identity>()
            .map_err(|source| BootError::MalformedFake { source })?;
        return Ok(BootProcedure::Fake { identity });
    }

    if let Some(who) = config.who.as_deref() {
        let expected = who
            .parse::<Identity>()
            .map_err(|source| BootError::MalformedWho { source })?;
        let seed = decode_seed(read_key(config)?, Some(&expected))?;
        return Ok(BootProcedure::Dawn { seed });
    }

    Ok(BootProcedure::Comet { parent: None })
}

fn read_key(config: &Config) -> Result<String, BootError> {
    match config.key_source() {
        KeySource::File(path) => {
            let mut key = fs::read_to_string(&path)
                .map_err(|source| BootError::KeyRead { path, source })?;
            if key.ends_with('\n') {
                key.pop();
            }
            Ok(key)
        }
        KeySource::Inline(key) => Ok(key),
        KeySource::Missing => Err(BootError::MissingKey),
    }
}
