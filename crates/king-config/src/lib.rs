//! Host configuration shared by the king daemon and its tooling.
//!
//! Values are layered by [`ortho_config`]: built-in defaults, an optional
//! TOML file named with `--config-path`, `KING_*` environment variables, and
//! finally command-line flags. The resulting [`Config`] is read-only to the
//! daemon; typed views such as [`PillSource`] and [`KeySource`] interpret the
//! raw fields without mutating them.

mod defaults;
mod flags;
mod logging;
mod sources;

use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_CA_BUNDLE, DEFAULT_LOG_FILTER, DEFAULT_LOOP_TICK_MS, default_log_filter,
    default_log_format,
};
pub use flags::RuntimeFlags;
pub use logging::{LogFormat, LogFormatParseError};
pub use sources::{KeySource, PillSource, SourceError};

/// Resolved host configuration for a single daemon run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "KING")]
pub struct Config {
    /// Pier directory the daemon boots or resumes.
    pub pier: Option<Utf8PathBuf>,
    /// Boot a fresh pier instead of resuming existing state.
    #[serde(default)]
    pub new_pier: bool,
    /// Synthetic identity for an unattested test boot.
    pub fake: Option<String>,
    /// Identity the attested seed must belong to.
    pub who: Option<String>,
    /// File holding the encoded private-key seed.
    pub key_file: Option<Utf8PathBuf>,
    /// Encoded private-key seed supplied inline.
    pub generated_key: Option<String>,
    /// Local pill file.
    pub pill_path: Option<Utf8PathBuf>,
    /// Explicit pill URL.
    pub pill_url: Option<String>,
    /// Source repository used for filesystem preparation and hash-derived pills.
    pub arvo_path: Option<Utf8PathBuf>,
    /// Derive the pill URL from the repository's latest system commit.
    #[serde(default)]
    pub git_pill: bool,
    /// Override for the embedded bootstrap image.
    pub lite_pill: Option<Utf8PathBuf>,
    /// Trust-anchor bundle copied into the transient certificate file.
    pub ca_bundle: Option<Utf8PathBuf>,
    /// `tracing` filter expression.
    pub log_filter: Option<String>,
    /// Log output format.
    pub log_format: Option<LogFormat>,
    /// Upper bound on a single blocking wait of the event loop, in milliseconds.
    pub loop_tick_ms: Option<u64>,
    /// Verbose runtime output.
    #[serde(default)]
    pub verbose: bool,
    /// Suppress runtime output.
    #[serde(default)]
    pub quiet: bool,
    /// Compute events without persisting them.
    #[serde(default)]
    pub dry_run: bool,
    /// Emit interpreter traces.
    #[serde(default)]
    pub trace: bool,
    /// Enable memory debugging in the runtime.
    #[serde(default)]
    pub debug_ram: bool,
    /// Verify heap integrity during execution.
    #[serde(default)]
    pub check_corrupt: bool,
}

impl Config {
    /// Loads configuration from the process arguments and environment.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when an argument, environment variable or
    /// configuration file cannot be parsed.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        Self::load_from_iter(std::env::args_os())
    }

    /// Loads configuration from an explicit argument iterator.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when a layer cannot be parsed or merged.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Pier directory, when one was configured.
    #[must_use]
    pub fn pier_path(&self) -> Option<&Utf8Path> {
        self.pier.as_deref()
    }

    /// Effective log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    /// Effective log format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format.unwrap_or_else(default_log_format)
    }

    /// Maximum blocking wait of one loop turn.
    #[must_use]
    pub fn loop_tick(&self) -> Duration {
        Duration::from_millis(self.loop_tick_ms.unwrap_or(DEFAULT_LOOP_TICK_MS))
    }

    /// Path the trust-anchor bundle is read from.
    #[must_use]
    pub fn ca_bundle(&self) -> &Utf8Path {
        self.ca_bundle
            .as_deref()
            .unwrap_or_else(|| Utf8Path::new(DEFAULT_CA_BUNDLE))
    }

    /// Runtime flags forwarded to the pier.
    #[must_use]
    pub fn runtime_flags(&self) -> RuntimeFlags {
        RuntimeFlags::from_config(self)
    }

    /// Where the boot pill should come from.
    ///
    /// # Errors
    ///
    /// Fails when no pill source is configured or the pill URL is invalid.
    pub fn pill_source(&self) -> Result<PillSource, SourceError> {
        PillSource::from_config(self)
    }

    /// Where the attested-boot seed should come from.
    #[must_use]
    pub fn key_source(&self) -> KeySource {
        KeySource::from_config(self)
    }
}
