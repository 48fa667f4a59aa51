//! Configuration loaders covering the success and failure paths of
//! [`run_daemon_with`](crate::run_daemon_with).

use std::ffi::OsString;
use std::fs;
use std::sync::Arc;

use camino::Utf8Path;
use ortho_config::OrthoError;
use tempfile::TempDir;

use king_config::Config;

use crate::bootstrap::ConfigLoader;

/// Loader pointing at an existing pier under a temporary directory.
pub struct TestConfigLoader {
    dir: TempDir,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temporary directory for pier");
        fs::create_dir_all(dir.path().join("zod")).expect("failed to create pier directory");
        Self { dir }
    }

    fn root(&self) -> &Utf8Path {
        Utf8Path::from_path(self.dir.path()).expect("temporary directory was not valid UTF-8")
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            pier: Some(self.root().join("zod")),
            ca_bundle: Some(self.root().join("absent-bundle.pem")),
            log_filter: Some("off".to_owned()),
            loop_tick_ms: Some(5),
            ..Config::default()
        })
    }
}

/// Loader that intentionally fails by passing an unparsable CLI value.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("kingd"),
            OsString::from("--loop-tick-ms"),
            OsString::from("soon"),
        ];
        Config::load_from_iter(args)
    }
}
