//! Scenario world: configuration, recording collaborators and the outcome of
//! a daemon run.

use std::cell::RefCell;
use std::fs;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;

use king_config::Config;

use crate::certs::TransientCertificates;
use crate::errors::{KingError, KingExit};
use crate::king::{King, KingDeps};
use crate::pill::MockShellRunner;
use crate::signals::RAISE_LOCK;

use super::collaborators::{
    FakeAttestor, FakeRuntime, RecordingFetcher, RecordingPier, RecordingTerminal,
};
use super::reporter::RecordingReporter;

/// Scenario world shared across BDD steps.
pub struct TestWorld {
    _temp: TempDir,
    root: Utf8PathBuf,
    /// Configuration the daemon is built with.
    pub config: Config,
    /// Pier manager double.
    pub pier: RecordingPier,
    /// Terminal double.
    pub terminal: RecordingTerminal,
    /// Bootstrap interpreter double.
    pub runtime: FakeRuntime,
    /// Attestation double.
    pub attestor: FakeAttestor,
    /// Pill download double.
    pub fetcher: RecordingFetcher,
    /// Shell expectations consumed by the next daemon built.
    pub shell: Option<MockShellRunner>,
    /// Lifecycle events seen by every daemon built from this world.
    pub reporter: Arc<RecordingReporter>,
    slog_left_installed: Option<bool>,
    result: Option<Result<KingExit, KingError>>,
}

impl TestWorld {
    /// Builds a world rooted in a fresh temporary directory.
    #[must_use]
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("temporary directory");
        let root = Utf8Path::from_path(temp.path())
            .expect("utf8 temporary directory")
            .to_path_buf();
        let config = Config {
            pier: Some(root.join("pier")),
            loop_tick_ms: Some(5),
            ..Config::default()
        };
        Self {
            _temp: temp,
            root,
            config,
            pier: RecordingPier::default(),
            terminal: RecordingTerminal::default(),
            runtime: FakeRuntime::default(),
            attestor: FakeAttestor::default(),
            fetcher: RecordingFetcher::default(),
            shell: None,
            reporter: Arc::new(RecordingReporter::default()),
            slog_left_installed: None,
            result: None,
        }
    }

    /// Directory scenario files are written under.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Writes `contents` to `name` under the world root.
    pub fn write_file(&self, name: &str, contents: &[u8]) -> Utf8PathBuf {
        let path = self.root.join(name);
        fs::write(&path, contents).expect("write scenario file");
        path
    }

    /// Builds a daemon over clones of the recording collaborators.
    pub fn king(&mut self) -> King {
        self.king_with(None)
    }

    /// As [`TestWorld::king`], handing the daemon a trust-anchor file to
    /// remove at teardown.
    pub fn king_with(&mut self, certificates: Option<TransientCertificates>) -> King {
        let deps = KingDeps {
            pier: Box::new(self.pier.clone()),
            terminal: Box::new(self.terminal.clone()),
            lite: Box::new(self.runtime.clone()),
            attestor: Box::new(self.attestor.clone()),
            fetcher: Box::new(self.fetcher.clone()),
            shell: Box::new(self.shell.take().unwrap_or_default()),
            reporter: self.reporter.clone(),
        };
        King::new(self.config.clone(), deps, certificates)
    }

    /// Runs the daemon once and records the outcome.
    pub fn run(&mut self) {
        let _raising = self.pier.raises_on_boot().then(|| {
            RAISE_LOCK
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        });
        let mut king = self.king();
        self.result = Some(king.run());
        self.slog_left_installed = Some(king.slog().is_installed());
    }

    /// Outcome of the last run.
    #[must_use]
    pub fn result(&self) -> Option<&Result<KingExit, KingError>> {
        self.result.as_ref()
    }

    /// Whether the run ended with the diagnostic sink still installed.
    #[must_use]
    pub fn slog_left_installed(&self) -> Option<bool> {
        self.slog_left_installed
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture constructing a fresh world.
pub fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new())
}
