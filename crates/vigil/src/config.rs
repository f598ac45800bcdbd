use std::collections::HashSet;
use std::time::Duration;
use std::{env, fmt, fs, io, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::monitoring::types::TargetConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFailed { path: path::PathBuf, source: io::Error },
    #[error("failed to write config file {path}: {source}")]
    WriteFailed { path: path::PathBuf, source: io::Error },
    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("no config path available: neither XDG_CONFIG_HOME nor HOME is set")]
    ConfigPathUnavailable,
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Upper bound for every `*_secs` setting (100 years).
pub const MAX_DURATION_SECS: u64 = 100 * 365 * 24 * 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: path::PathBuf,
    pub pool_size: usize,
}

/// Timing constants of the engine, all in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub check_cycle_interval_secs: u64,
    pub purge_older_than_secs: u64,
    pub status_latest_period_secs: u64,
    pub stale_after_secs: u64,
    pub error_notification_norepeat_secs: u64,
    pub reference_success_ratio: f64,
    pub retrograde_validity_secs: u64,
    pub network_poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: path::PathBuf::from("vigil.db"), pool_size: crate::pool::DEFAULT_POOL_SIZE }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            check_cycle_interval_secs: 15 * 60,
            purge_older_than_secs: 7 * 24 * 3600,
            status_latest_period_secs: 24 * 3600,
            stale_after_secs: 60 * 60,
            error_notification_norepeat_secs: 60 * 60,
            reference_success_ratio: 0.5,
            retrograde_validity_secs: 30 * 60,
            network_poll_interval_secs: 30,
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { connect_timeout_secs: 30, read_timeout_secs: 30 }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "127.0.0.1".into(), port: 8080 }
    }
}

impl MonitoringConfig {
    pub fn check_cycle_interval(&self) -> Duration {
        Duration::from_secs(self.check_cycle_interval_secs)
    }

    pub fn purge_older_than(&self) -> Duration {
        Duration::from_secs(self.purge_older_than_secs)
    }

    pub fn status_latest_period(&self) -> Duration {
        Duration::from_secs(self.status_latest_period_secs)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    pub fn error_notification_norepeat(&self) -> Duration {
        Duration::from_secs(self.error_notification_norepeat_secs)
    }

    pub fn retrograde_validity(&self) -> Duration {
        Duration::from_secs(self.retrograde_validity_secs)
    }

    pub fn network_poll_interval(&self) -> Duration {
        Duration::from_secs(self.network_poll_interval_secs)
    }
}

impl ProbeConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/vigil/config.toml or
/// $HOME/.config/...)
pub fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("vigil/config.toml"))
}

/// Resolve the path a config would be loaded from.
pub fn resolve_config_path(
    optional_path: Option<impl AsRef<path::Path>>,
) -> Result<path::PathBuf, ConfigError> {
    match optional_path {
        Some(path) => Ok(normalize_toml_path(path.as_ref())),
        None => default_config_path(),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            monitoring: MonitoringConfig::default(),
            probe: ProbeConfig::default(),
            server: ServerConfig::default(),
            targets: vec![
                TargetConfig::new("google", "https://www.google.com/").expect_status(200).reference(),
                TargetConfig::new("cloudflare", "https://www.cloudflare.com/")
                    .expect_status(200)
                    .reference(),
                TargetConfig::new("wikipedia", "https://www.wikipedia.org/")
                    .expect_status(200)
                    .reference(),
            ],
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let write_2 = write_indented(2);
        let monitoring = &self.monitoring;

        writeln!(f, "Current Configuration:")?;
        write_title_1(f, "Database")?;
        write_1(f, "Path", &self.database.path.display())?;
        write_1(f, "Pool size", &self.database.pool_size)?;
        write_title_1(f, "Monitoring")?;
        write_1(f, "Cycle interval (s)", &monitoring.check_cycle_interval_secs)?;
        write_1(f, "Purge older than (s)", &monitoring.purge_older_than_secs)?;
        write_1(f, "Status period (s)", &monitoring.status_latest_period_secs)?;
        write_1(f, "Stale after (s)", &monitoring.stale_after_secs)?;
        write_1(f, "Alert no-repeat (s)", &monitoring.error_notification_norepeat_secs)?;
        write_1(f, "Reference success ratio", &monitoring.reference_success_ratio)?;
        write_1(f, "Retrograde validity (s)", &monitoring.retrograde_validity_secs)?;
        write_1(f, "Network poll (s)", &monitoring.network_poll_interval_secs)?;
        write_title_1(f, "Probe")?;
        write_1(f, "Connect timeout (s)", &self.probe.connect_timeout_secs)?;
        write_1(f, "Read timeout (s)", &self.probe.read_timeout_secs)?;
        write_title_1(f, "Server")?;
        write_1(f, "Bind Address", &self.server.bind)?;
        write_1(f, "Port", &self.server.port)?;
        write_title_1(f, "Targets")?;
        for target in &self.targets {
            let kind = if target.is_reference { "reference" } else { "target" };
            write_1(f, &target.id, &format_args!("{} ({kind})", target.url))?;
            if let Some(code) = target.expected_status_code {
                write_2(f, "Expected status", &code)?;
            }
            if let Some(content) = &target.expected_content {
                write_2(f, "Expected content", content)?;
            }
        }

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/vigil/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```no_run
    /// let cfg = vigil::config::Config::from_config(None::<&std::path::Path>)?;
    /// println!("{}", cfg);
    /// # Ok::<(), vigil::config::ConfigError>(())
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path = resolve_config_path(optional_path)?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Read and validate an existing file.
    pub fn load(path: &path::Path) -> Result<Self, ConfigError> {
        let raw_string = fs::read_to_string(path)
            .map_err(|source| ConfigError::ReadFailed { path: path.to_path_buf(), source })?;
        Self::parse(&raw_string)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| ConfigError::WriteFailed { path: parent.to_path_buf(), source })?;
        }

        fs::write(path, config_str)
            .map_err(|source| ConfigError::WriteFailed { path: path.to_path_buf(), source })
    }

    /// Durations that must be non-zero.
    fn duration_fields(&self) -> [(&'static str, u64); 8] {
        let monitoring = &self.monitoring;
        [
            ("check_cycle_interval_secs", monitoring.check_cycle_interval_secs),
            ("purge_older_than_secs", monitoring.purge_older_than_secs),
            ("status_latest_period_secs", monitoring.status_latest_period_secs),
            ("stale_after_secs", monitoring.stale_after_secs),
            ("retrograde_validity_secs", monitoring.retrograde_validity_secs),
            ("network_poll_interval_secs", monitoring.network_poll_interval_secs),
            ("connect_timeout_secs", self.probe.connect_timeout_secs),
            ("read_timeout_secs", self.probe.read_timeout_secs),
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::Invalid(message));
        let monitoring = &self.monitoring;

        for (name, value) in self.duration_fields() {
            if value == 0 {
                return invalid(format!("{name} must be greater than zero"));
            }
        }

        let norepeat = ("error_notification_norepeat_secs", monitoring.error_notification_norepeat_secs);
        for (name, value) in [norepeat].into_iter().chain(self.duration_fields()) {
            if value > MAX_DURATION_SECS {
                return invalid(format!("{name} must be at most {MAX_DURATION_SECS} seconds, got {value}"));
            }
        }

        if self.database.pool_size == 0 {
            return invalid("pool_size must be greater than zero".to_string());
        }

        if !(0.0..=1.0).contains(&monitoring.reference_success_ratio) {
            return invalid(format!(
                "reference_success_ratio must be within [0, 1], got {}",
                monitoring.reference_success_ratio
            ));
        }

        let mut seen = HashSet::new();
        for target in &self.targets {
            if target.id.trim().is_empty() {
                return invalid(format!("target with url {} has an empty id", target.url));
            }
            if !seen.insert(target.id.as_str()) {
                return invalid(format!("duplicate target id {}", target.id));
            }
            match url::Url::parse(&target.url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => return invalid(format!("target {} uses unsupported scheme {}", target.id, url.scheme())),
                Err(e) => return invalid(format!("target {} has an invalid url: {e}", target.id)),
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.targets.iter().all(|t| t.is_reference));
        assert_eq!(config.monitoring.check_cycle_interval(), Duration::from_secs(900));
    }

    #[test]
    fn test_parse_targets_and_partial_sections() {
        let config = Config::parse(
            r#"
            [monitoring]
            check_cycle_interval_secs = 60

            [[targets]]
            id = "api"
            url = "https://api.example.com/health"
            expected_status_code = 200
            expected_content = "ok"

            [[targets]]
            id = "ref"
            url = "https://example.org"
            is_reference = true
            "#,
        )
        .unwrap();

        assert_eq!(config.monitoring.check_cycle_interval_secs, 60);
        assert_eq!(config.monitoring.stale_after_secs, 3600);
        assert_eq!(config.probe.read_timeout_secs, 30);
        assert_eq!(config.targets.len(), 2);
        assert_eq!(config.targets[0].expected_content.as_deref(), Some("ok"));
        assert!(!config.targets[0].is_reference);
        assert!(config.targets[1].is_reference);
    }

    #[test]
    fn test_rejects_invalid_targets() {
        let duplicate = r#"
            [[targets]]
            id = "a"
            url = "https://a.example"
            [[targets]]
            id = "a"
            url = "https://b.example"
        "#;
        assert!(matches!(Config::parse(duplicate), Err(ConfigError::Invalid(_))));

        let scheme = r#"
            [[targets]]
            id = "a"
            url = "ftp://a.example"
        "#;
        assert!(matches!(Config::parse(scheme), Err(ConfigError::Invalid(_))));

        let ratio = "[monitoring]\nreference_success_ratio = 1.5\n";
        assert!(matches!(Config::parse(ratio), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_durations_beyond_bound() {
        let huge = format!("[monitoring]\npurge_older_than_secs = {}\n", i64::MAX);
        assert!(matches!(Config::parse(&huge), Err(ConfigError::Invalid(_))));

        let norepeat = format!("[monitoring]\nerror_notification_norepeat_secs = {}\n", MAX_DURATION_SECS + 1);
        assert!(matches!(Config::parse(&norepeat), Err(ConfigError::Invalid(_))));

        let at_bound = format!("[monitoring]\nstale_after_secs = {MAX_DURATION_SECS}\n");
        assert!(Config::parse(&at_bound).is_ok());
    }

    #[test]
    fn test_from_config_writes_default_when_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/vigil");

        let created = Config::from_config(Some(&path)).unwrap();
        let written = dir.path().join("nested/vigil.toml");
        assert!(written.exists());

        let reloaded = Config::from_config(Some(&written)).unwrap();
        assert_eq!(reloaded.targets, created.targets);
    }
}
