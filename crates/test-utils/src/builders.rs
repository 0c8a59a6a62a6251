#![allow(dead_code)]

use watchrun::config::RawConfigFile;
use watchrun::exec::KillStrategy;

/// Builder for a `RawConfigFile` layer to simplify test setup.
#[derive(Debug, Default)]
pub struct RawConfigFileBuilder {
    raw: RawConfigFile,
}

impl RawConfigFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.raw.include = Some(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.raw.exclude = Some(pattern.to_string());
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.raw
            .paths
            .get_or_insert_with(Vec::new)
            .push(path.to_string());
        self
    }

    pub fn env_file(mut self, path: &str) -> Self {
        self.raw.env_file = Some(path.to_string());
        self
    }

    pub fn debounce(mut self, duration: &str) -> Self {
        self.raw.debounce = Some(duration.to_string());
        self
    }

    pub fn kill_strategy(mut self, strategy: KillStrategy) -> Self {
        self.raw.kill_strategy = Some(strategy);
        self
    }

    pub fn command(mut self, argv: &[&str]) -> Self {
        self.raw.command = Some(argv.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn build(self) -> RawConfigFile {
        self.raw
    }
}
