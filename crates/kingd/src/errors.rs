//! Defines the single fatal error boundary of the daemon.

use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use nix::errno::Errno;
use ortho_config::OrthoError;
use thiserror::Error;

use crate::boot::BootError;
use crate::certs::CertificateError;
use crate::collaborators::{LiteBootError, PierError};
use crate::command::ProtocolError;
use crate::pill::{FetchError, PillError};
use crate::seed::SeedError;
use crate::signals::SignalError;
use crate::telemetry::TelemetryError;

/// How a daemon run ended without a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KingExit {
    /// The loop ran out of work.
    Drained,
    /// A quit request demands an immediate abort.
    Aborted,
}

/// Fatal failures of a daemon run.
///
/// Every failure other than signal handling ends the run. The binary logs
/// the error and exits with a non-zero status.
#[derive(Debug, Error)]
pub enum KingError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Config {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry could not be installed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// A command violated the protocol.
    #[error("protocol violation: {source}")]
    Protocol {
        /// Underlying protocol error.
        #[source]
        source: ProtocolError,
    },
    /// Boot resolution failed.
    #[error("{source}")]
    Boot {
        /// Underlying boot error.
        #[source]
        source: BootError,
    },
    /// Pill acquisition failed.
    #[error("{source}")]
    Pill {
        /// Underlying acquisition error.
        #[source]
        source: PillError,
    },
    /// Seed validation failed.
    #[error("dawn: {source}")]
    Seed {
        /// Underlying seed error.
        #[source]
        source: SeedError,
    },
    /// The pier manager reported a failure.
    #[error("{source}")]
    Pier {
        /// Underlying pier error.
        #[source]
        source: PierError,
    },
    /// The bootstrap interpreter failed to start.
    #[error("{source}")]
    LiteBoot {
        /// Underlying interpreter error.
        #[source]
        source: LiteBootError,
    },
    /// Signal subscriptions could not be managed.
    #[error("signal handling failed: {source}")]
    Signals {
        /// Underlying signal error.
        #[source]
        source: SignalError,
    },
    /// The trust-anchor file could not be prepared.
    #[error("{source}")]
    Certificates {
        /// Underlying certificate error.
        #[source]
        source: CertificateError,
    },
    /// The broken-pipe policy could not be installed.
    #[error("failed to ignore SIGPIPE: {source}")]
    BrokenPipe {
        /// Underlying OS error.
        source: Errno,
    },
    /// The bootstrap image override could not be read.
    #[error("lite: failed to read bootstrap image '{path}': {source}")]
    BootstrapImage {
        /// Override path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing the memory report failed.
    #[error("failed to write memory report: {source}")]
    Report {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl From<Arc<OrthoError>> for KingError {
    fn from(source: Arc<OrthoError>) -> Self {
        Self::Config { source }
    }
}

impl From<TelemetryError> for KingError {
    fn from(source: TelemetryError) -> Self {
        Self::Telemetry { source }
    }
}

impl From<ProtocolError> for KingError {
    fn from(source: ProtocolError) -> Self {
        match source {
            ProtocolError::Seed(source) => Self::Seed { source },
            source => Self::Protocol { source },
        }
    }
}

impl From<BootError> for KingError {
    fn from(source: BootError) -> Self {
        Self::Boot { source }
    }
}

impl From<PillError> for KingError {
    fn from(source: PillError) -> Self {
        Self::Pill { source }
    }
}

impl From<FetchError> for KingError {
    fn from(source: FetchError) -> Self {
        Self::Pill {
            source: PillError::Fetch(source),
        }
    }
}

impl From<SeedError> for KingError {
    fn from(source: SeedError) -> Self {
        Self::Seed { source }
    }
}

impl From<PierError> for KingError {
    fn from(source: PierError) -> Self {
        Self::Pier { source }
    }
}

impl From<LiteBootError> for KingError {
    fn from(source: LiteBootError) -> Self {
        Self::LiteBoot { source }
    }
}

impl From<SignalError> for KingError {
    fn from(source: SignalError) -> Self {
        Self::Signals { source }
    }
}

impl From<CertificateError> for KingError {
    fn from(source: CertificateError) -> Self {
        Self::Certificates { source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_failures_inside_commands_surface_as_seed_errors() {
        let error = KingError::from(ProtocolError::Seed(SeedError::InvalidEncoding {
            text: "~bogus".to_owned(),
        }));
        assert!(matches!(error, KingError::Seed { .. }));
        assert_eq!(error.to_string(), "dawn: invalid private keys: ~bogus");
    }

    #[test]
    fn unsupported_commands_are_protocol_violations() {
        let error = KingError::from(ProtocolError::Unsupported("exit"));
        assert_eq!(
            error.to_string(),
            "protocol violation: command 'exit' is not supported"
        );
    }
}
