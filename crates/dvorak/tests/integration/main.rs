//! Integration tests for dvorak
//!
//! Config loading tests only need the fixtures. Tests that talk to a real
//! Docker daemon and need the `dvorak-py` and `dvorak-cpp` images, or to a
//! Redis server (`DVORAK_TEST_REDIS_URL`), are marked `#[ignore]`.
//! Run with: cargo test -p dvorak --features integration-tests
//!
//! To include the Docker tests:
//!    cargo test -p dvorak --features integration-tests -- --include-ignored

#![cfg(feature = "integration-tests")]

use std::fs;
use std::sync::Arc;

use dvorak::config::Config;
use dvorak::judge::Judge;
use dvorak::problem::FsProblemLoader;
use dvorak::sandbox::DockerRuntime;

mod config_loading;
mod sandbox_lifecycle;

const FIXTURES_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

/// Helper to get fixture file content
pub(crate) fn fixture_source(name: &str) -> String {
    let path = format!("{FIXTURES_PATH}/sources/{name}");
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read fixture {path}: {e}"))
}

pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.problems_dir = format!("{FIXTURES_PATH}/problems").into();
    config
}

pub(crate) fn docker_runtime(config: &Config) -> Arc<DockerRuntime> {
    Arc::new(DockerRuntime::new(
        config.docker_binary(),
        config.sandbox.clone(),
    ))
}

pub(crate) fn docker_judge() -> Judge {
    let config = test_config();
    let runtime = docker_runtime(&config);
    let problems = Arc::new(FsProblemLoader::new(&config.problems_dir));
    Judge::new(Arc::new(config), runtime, problems)
}
