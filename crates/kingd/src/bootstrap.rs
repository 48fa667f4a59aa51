//! Daemon entry point wiring configuration, telemetry and collaborators.

use std::sync::Arc;

use camino::Utf8PathBuf;
use ortho_config::OrthoError;

use king_config::Config;

use crate::certs::TransientCertificates;
use crate::errors::{KingError, KingExit};
use crate::health::{LifecycleReporter, StructuredLifecycleReporter};
use crate::king::{King, KingDeps};
use crate::pill::{HttpFetcher, SystemShell};
use crate::placeholder::{DetachedPier, InertRuntime, OfflineAttestor, StderrTerminal};
use crate::telemetry;

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader {
    /// Loads the host configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loads configuration from the process and runs the daemon.
///
/// # Errors
///
/// Returns the first fatal error of the run.
pub fn run_daemon() -> Result<KingExit, KingError> {
    run_daemon_with(&SystemConfigLoader)
}

/// Runs the daemon with configuration from `loader` and the collaborators
/// linked into this build.
///
/// # Errors
///
/// Returns the first fatal error of the run.
pub fn run_daemon_with(loader: &dyn ConfigLoader) -> Result<KingExit, KingError> {
    let config = loader.load()?;
    telemetry::initialise(&config)?;

    let temp_dir = Utf8PathBuf::from_path_buf(std::env::temp_dir())
        .unwrap_or_else(|_| Utf8PathBuf::from("/tmp"));
    let certificates = TransientCertificates::write(config.ca_bundle(), &temp_dir)?;
    let fetcher = match HttpFetcher::new(certificates.path()) {
        Ok(fetcher) => fetcher,
        Err(error) => {
            certificates.remove();
            return Err(error.into());
        }
    };

    let reporter: Arc<dyn LifecycleReporter> = Arc::new(StructuredLifecycleReporter::new());
    let deps = KingDeps {
        pier: Box::new(DetachedPier::default()),
        terminal: Box::new(StderrTerminal),
        lite: Box::new(InertRuntime::default()),
        attestor: Box::new(OfflineAttestor),
        fetcher: Box::new(fetcher),
        shell: Box::new(SystemShell),
        reporter,
    };
    King::new(config, deps, Some(certificates)).run()
}
