use tracing::{debug, info, warn};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

pub struct Logger;

impl Logger {
    /// Install the global subscriber. `RUST_LOG` wins over the default filter.
    pub fn init() {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("neuter=info"));

        // A second init (tests, embedding) is harmless.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init();
    }

    pub fn bundle_start(entry: &str) {
        info!("🔨 Bundling {}", entry);
    }

    pub fn module_discovered(path: &str, references: usize) {
        debug!("🔍 Module: {} ({} require calls)", path, references);
    }

    pub fn external_reference(requirer: &str, specifier: &str) {
        warn!("↪️  Leaving require('{}') in {} untouched (no such module)", specifier, requirer);
    }

    pub fn skipped_reference(requirer: &str, target: &str) {
        debug!("⏭️  {} requires skip-listed {}", requirer, target);
    }

    pub fn cycle_broken(from: &str, to: &str) {
        debug!("🔁 Cycle: {} -> {} re-enters a module in progress, edge not followed", from, to);
    }

    pub fn processing_module(path: &str) {
        debug!("⚡ Processing: {}", path);
    }

    pub fn bundle_complete(entry: &str, modules: usize, bytes: usize, with_map: bool, elapsed: std::time::Duration) {
        info!(
            "✅ {}: {} modules, {} bytes{} in {:.2?}",
            entry,
            modules,
            bytes,
            if with_map { " + source map" } else { "" },
            elapsed
        );
    }

    pub fn artifact_written(path: &str, size: usize) {
        info!("📦 {} ({} bytes)", path, size);
    }

    pub fn debug(msg: &str) {
        debug!("{}", msg);
    }
}

pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    pub fn start(name: &str) -> Self {
        debug!("⏱️  Starting: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!("⏱️  Completed: {} in {:.2?}", self.name, self.elapsed());
    }
}
