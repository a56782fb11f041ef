//! Integration tests for arbiter
//!
//! These tests require the isolate binary to be installed and accessible.
//! Run with: cargo test -p arbiter --features integration-tests
//!
//! Tests that require root are marked `#[ignore]`. To include them:
//!    cargo test -p arbiter --features integration-tests -- --include-ignored

#![cfg(feature = "integration-tests")]

use arbiter::{BoxPool, Config, Judge};

mod pool_lifecycle;
mod scenarios;
mod streaming;

/// Config for tests: default registry, but a small box range away from
/// ids a locally running service might occupy.
pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.box_min_id = 900;
    config.box_max_id = 915;
    config
}

/// A judge over a small injected pool
pub(crate) fn test_judge() -> Judge {
    let config = test_config();
    let pool = BoxPool::new(config.box_min_id, config.box_max_id);
    Judge::with_pool(config, pool)
}
