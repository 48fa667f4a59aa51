//! Test harness utilities for the daemon suites.

mod collaborators;
mod config_loader;
mod reporter;
mod world;

pub use collaborators::{
    FakeAttestor, FakeRuntime, RecordingFetcher, RecordingPier, RecordingTerminal,
};
pub use config_loader::{FailingConfigLoader, TestConfigLoader};
pub use reporter::{LifecycleEvent, RecordingReporter};
pub use world::{TestWorld, world};
