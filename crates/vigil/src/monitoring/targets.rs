use std::path::PathBuf;

use crate::config::{Config, ConfigError};
use crate::monitoring::types::TargetConfig;

/// Where the set of monitored targets comes from. Called once at the start of
/// every cycle; the answer may differ between cycles.
pub trait TargetSource: Send + Sync {
    fn list_targets(&self) -> Result<Vec<TargetConfig>, ConfigError>;
}

/// Fixed list, mostly for tests and one-shot runs.
#[derive(Debug, Clone, Default)]
pub struct StaticTargets(pub Vec<TargetConfig>);

impl TargetSource for StaticTargets {
    fn list_targets(&self) -> Result<Vec<TargetConfig>, ConfigError> {
        Ok(self.0.clone())
    }
}

/// Re-reads the `[[targets]]` of a config file on every call, so edits take
/// effect at the next cycle without a restart.
#[derive(Debug, Clone)]
pub struct FileTargets {
    path: PathBuf,
}

impl FileTargets {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TargetSource for FileTargets {
    fn list_targets(&self) -> Result<Vec<TargetConfig>, ConfigError> {
        Ok(Config::load(&self.path)?.targets)
    }
}
