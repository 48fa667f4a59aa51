//! Acquisition of the bootstrap pill.
//!
//! Sources are tried in strict order: a local file, then a URL derived from
//! a source repository, then an explicit URL. Every failure is fatal; there
//! are no retries.

mod fetch;
mod repository;
mod shell;

use std::fs;
use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

use king_config::{Config, PillSource, SourceError};

use crate::command::{CompletePill, Event, PillSpec};

pub use fetch::{FetchError, HttpFetcher, PillFetcher};
pub use repository::{GIT_PILL_URL_BASE, GIT_PILL_URL_SUFFIX, HASH_TOKEN_LEN, pill_url};
pub use shell::{ShellError, ShellRunner, SystemShell};

#[cfg(test)]
pub use fetch::MockPillFetcher;
#[cfg(test)]
pub use shell::MockShellRunner;

pub(crate) const PILL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::pill");

/// Failures acquiring a pill.
#[derive(Debug, Error)]
pub enum PillError {
    /// The configured sources could not be interpreted.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// A local pill file could not be read.
    #[error("boot: failed to read pill '{path}': {source}")]
    ReadLocal {
        /// Pill file.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// `git` is not available on this host.
    #[error("boot: git not found; it is required for a repository pill")]
    GitUnavailable {
        /// Lookup failure.
        #[source]
        source: ShellError,
    },
    /// The commit query failed.
    #[error("boot: failed to read latest commit of '{repository}': {source}")]
    Hash {
        /// Repository queried.
        repository: Utf8PathBuf,
        /// Query failure.
        #[source]
        source: ShellError,
    },
    /// The commit query printed something other than a hash.
    #[error("boot: unexpected commit hash output '{output}'")]
    MalformedHash {
        /// Raw output.
        output: String,
    },
    /// A derived URL did not parse.
    #[error("boot: invalid pill url '{url}': {message}")]
    InvalidUrl {
        /// Offending URL text.
        url: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Downloading the pill failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The filesystem preparation directory could not be captured.
    #[error("boot: failed to capture filesystem '{path}': {source}")]
    Filesystem {
        /// Directory captured.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Acquires the pill selected by `config`.
///
/// When a repository path is configured, an initial filesystem event is
/// captured from it and paired with the pill whatever its source.
///
/// # Errors
///
/// Returns a [`PillError`] describing the first failing step.
pub fn acquire_pill(
    config: &Config,
    fetcher: &dyn PillFetcher,
    shell: &dyn ShellRunner,
) -> Result<PillSpec, PillError> {
    let payload = match config.pill_source()? {
        PillSource::Local(path) => {
            tracing::info!(target: PILL_TARGET, %path, "boot: loading pill");
            fs::read(&path).map_err(|source| PillError::ReadLocal { path, source })?
        }
        PillSource::Repository(repository) => fetcher.fetch(&pill_url(&repository, shell)?)?,
        PillSource::Url(url) => fetcher.fetch(&url)?,
    };

    let override_event = config
        .arvo_path
        .as_deref()
        .map(|path| {
            Event::initial_filesystem(path).map_err(|source| PillError::Filesystem {
                path: path.to_path_buf(),
                source,
            })
        })
        .transpose()?;

    Ok(PillSpec::Complete(CompletePill {
        payload,
        override_event,
    }))
}
