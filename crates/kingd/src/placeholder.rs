//! Placeholder collaborators linked into the binary until the pier, terminal
//! and attestation subsystems are available.

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};

use king_config::RuntimeFlags;

use crate::collaborators::{
    AttestError, Attestation, Attestor, BootRequest, LiteBootError, LiteRuntime, PierError,
    PierManager, Terminal,
};
use crate::identity::Identity;
use crate::seed::Seed;
use crate::signals::SignalControl;
use crate::slog::Slog;

const PLACEHOLDER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::placeholder");

/// Pier manager that records boot arguments without running a worker.
#[derive(Debug, Default)]
pub(crate) struct DetachedPier {
    signals: Option<SignalControl>,
    active: Option<Utf8PathBuf>,
}

impl PierManager for DetachedPier {
    fn install_signal_control(&mut self, control: SignalControl) {
        self.signals = Some(control);
    }

    fn boot(&mut self, request: BootRequest) -> Result<(), PierError> {
        // Delivery is paused while a worker would be spawned.
        if let Some(signals) = &self.signals {
            signals.hold();
            signals
                .resume()
                .map_err(|error| PierError::new("boot", error.to_string()))?;
        }
        tracing::warn!(
            target: PLACEHOLDER_TARGET,
            ship = %request.identity,
            pier = %request.pier,
            pill_bytes = request.pill.payload.len(),
            "pier boot requested but no worker is linked"
        );
        self.active = Some(request.pier);
        Ok(())
    }

    fn resume(&mut self, _flags: RuntimeFlags, path: &Utf8Path) -> Result<(), PierError> {
        if !path.is_dir() {
            return Err(PierError::new(
                "resume",
                format!("pier '{path}' does not exist"),
            ));
        }
        tracing::warn!(
            target: PLACEHOLDER_TARGET,
            pier = %path,
            "pier resume requested but no worker is linked"
        );
        self.active = Some(path.to_path_buf());
        Ok(())
    }

    fn request_exit(&mut self) {
        tracing::info!(target: PLACEHOLDER_TARGET, "pier exit requested");
        self.active = None;
    }

    fn bail(&mut self) {
        self.active = None;
    }

    fn mark(&mut self, sink: &mut dyn Write) -> io::Result<u64> {
        writeln!(sink, "pier: detached")?;
        Ok(0)
    }

    fn active_pier(&self) -> Option<&Utf8Path> {
        self.active.as_deref()
    }

    fn is_live(&self) -> bool {
        false
    }
}

/// Terminal layer writing plain lines to stderr.
#[derive(Debug, Default)]
pub(crate) struct StderrTerminal;

impl Terminal for StderrTerminal {
    fn open_log_session(&mut self) {
        tracing::debug!(target: PLACEHOLDER_TARGET, "terminal log session opened");
    }

    fn close_log_session(&mut self) {
        tracing::debug!(target: PLACEHOLDER_TARGET, "terminal log session closed");
    }

    fn emit(&mut self, line: &str) {
        let mut stderr = io::stderr().lock();
        if let Err(error) = writeln!(stderr, "{line}") {
            tracing::debug!(target: PLACEHOLDER_TARGET, %error, "terminal write failed");
        }
    }

    fn forward_interrupt(&mut self) {
        tracing::debug!(target: PLACEHOLDER_TARGET, "interrupt has no subordinate to reach");
    }

    fn notify_resize(&mut self) {
        tracing::debug!(target: PLACEHOLDER_TARGET, "terminal resized");
    }

    fn report(
        &mut self,
        write: &mut dyn FnMut(&mut dyn Write) -> io::Result<()>,
    ) -> io::Result<()> {
        let mut stderr = io::stderr().lock();
        write(&mut stderr)
    }
}

/// Bootstrap interpreter that only checks its image is present.
#[derive(Debug, Default)]
pub(crate) struct InertRuntime {
    image_bytes: u64,
}

impl LiteRuntime for InertRuntime {
    fn boot(&mut self, flags: RuntimeFlags, image: &[u8]) -> Result<(), LiteBootError> {
        if image.is_empty() {
            return Err(LiteBootError {
                message: "bootstrap image is empty".to_owned(),
            });
        }
        self.image_bytes = u64::try_from(image.len()).unwrap_or(u64::MAX);
        tracing::debug!(target: PLACEHOLDER_TARGET, %flags, bytes = image.len(), "lite runtime loaded");
        Ok(())
    }

    fn mark(&mut self) -> u64 {
        self.image_bytes
    }

    fn sweep(&mut self) -> u64 {
        0
    }
}

/// Attestor for builds without the cryptographic primitives.
#[derive(Debug, Default)]
pub(crate) struct OfflineAttestor;

impl Attestor for OfflineAttestor {
    fn mine_comet(&mut self, _parent: Option<&Identity>) -> Result<Seed, AttestError> {
        Err(AttestError {
            operation: "come",
            message: "comet mining is not available in this build".to_owned(),
        })
    }

    fn attest(&mut self, seed: Seed, _slog: &Slog) -> Result<Attestation, AttestError> {
        Err(AttestError {
            operation: "dawn",
            message: format!("cannot attest {}: not available in this build", seed.identity()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::KeyMaterial;

    #[test]
    fn detached_pier_rejects_missing_directory() {
        let mut pier = DetachedPier::default();
        let error = pier
            .resume(RuntimeFlags::EMPTY, Utf8Path::new("/nonexistent/pier"))
            .expect_err("directory is missing");
        assert!(error.to_string().contains("does not exist"));
        assert!(pier.active_pier().is_none());
    }

    #[test]
    fn detached_pier_resumes_existing_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8Path::from_path(dir.path()).expect("utf8 temp dir");
        let mut pier = DetachedPier::default();
        pier.resume(RuntimeFlags::EMPTY, path).expect("resume");
        assert_eq!(pier.active_pier(), Some(path));
        assert!(!pier.is_live());
        pier.bail();
        assert!(pier.active_pier().is_none());
    }

    #[test]
    fn inert_runtime_requires_an_image() {
        let mut runtime = InertRuntime::default();
        assert!(runtime.boot(RuntimeFlags::HASHLESS, &[]).is_err());
        runtime
            .boot(RuntimeFlags::HASHLESS, &[1, 2, 3])
            .expect("image loads");
        assert_eq!(runtime.mark(), 3);
    }

    #[test]
    fn offline_attestor_names_the_identity() {
        let mut attestor = OfflineAttestor;
        let seed = Seed::new(Identity::new(0), 1, KeyMaterial::new(vec![1; 8]), None);
        let error = attestor
            .attest(seed, &Slog::new())
            .expect_err("attestation is unavailable");
        assert!(error.to_string().contains("~zod"));
        assert!(attestor.mine_comet(None).is_err());
    }
}
