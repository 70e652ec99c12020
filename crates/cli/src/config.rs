// Bootstrap configuration.
//
// Layering (later wins): built-in defaults, `~/.influxboot/config.toml` (or
// `--config` / `INFLUXBOOT_CONFIG`), environment overrides, CLI flags.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_ENV: &str = "INFLUXBOOT_CONFIG";
pub const CREDENTIALS_ENV: &str = "CREDENTIALS_FILE";
pub const HOST_ENV: &str = "INFLUX_HOST";

/// Root directory for influxboot state: `~/.influxboot/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".influxboot"))
}

/// Path to the default config file: `~/.influxboot/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BootstrapConfig {
    /// Credentials file holding `user`, `password`, `org`, `bucket`, `retention`, `token`.
    pub credentials_file: PathBuf,
    /// URL passed to every `influx` invocation as `--host`.
    pub host: String,
    pub daemon: DaemonConfig,
    pub cli: CliConfig,
    pub readiness: ReadinessConfig,
    /// What to do when `influx setup` reports the instance is already set up.
    pub on_already_initialized: AlreadyInitializedPolicy,
    /// Where the run-once marker lives.
    pub state_dir: PathBuf,
    /// Installer script removed after a successful run, if set.
    pub installer_script: Option<PathBuf>,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            credentials_file: dirs::home_dir()
                .map(|home| home.join("credentials.toml"))
                .unwrap_or_else(|| PathBuf::from("credentials.toml")),
            host: "http://localhost:8086".into(),
            daemon: DaemonConfig::default(),
            cli: CliConfig::default(),
            readiness: ReadinessConfig::default(),
            on_already_initialized: AlreadyInitializedPolicy::Skip,
            state_dir: global_dir().unwrap_or_else(|| PathBuf::from(".influxboot")),
            installer_script: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub binary: PathBuf,
    pub args: Vec<String>,
    /// Combined stdout/stderr of the daemon. Relative paths resolve against
    /// the working directory of the invocation.
    pub log_file: PathBuf,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { binary: "influxd".into(), args: Vec::new(), log_file: "influxd.log".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub binary: PathBuf,
    /// Upper bound for a single `influx` invocation.
    pub timeout_secs: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self { binary: "influx".into(), timeout_secs: 30 }
    }
}

impl CliConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReadinessConfig {
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self { timeout_secs: 40, poll_interval_ms: 500 }
    }
}

impl ReadinessConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlreadyInitializedPolicy {
    /// Treat a pre-initialized instance as success and carry on.
    Skip,
    /// Abort the run.
    Fail,
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub credentials_file: Option<PathBuf>,
}

impl BootstrapConfig {
    /// Load from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        toml::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Resolve the effective configuration from the process environment.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with_env(overrides, default_config_path(), |key| std::env::var_os(key))
    }

    fn resolve_with_env<F>(
        overrides: &ConfigOverrides,
        default_path: Option<PathBuf>,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let explicit =
            overrides.config_path.clone().or_else(|| env(CONFIG_ENV).map(PathBuf::from));

        let mut config = match explicit {
            // An explicitly named file has to exist.
            Some(path) => Self::load_from(&path)?,
            None => match default_path {
                Some(path) if path.exists() => Self::load_from(&path)?,
                _ => Self::default(),
            },
        };

        if let Some(path) = env(CREDENTIALS_ENV).filter(|value| !value.is_empty()) {
            config.credentials_file = PathBuf::from(path);
        }
        if let Some(host) = env(HOST_ENV).and_then(|value| value.into_string().ok()) {
            if !host.trim().is_empty() {
                config.host = host;
            }
        }

        if let Some(path) = &overrides.credentials_file {
            config.credentials_file = path.clone();
        }

        Ok(config)
    }

    pub fn marker_path(&self) -> PathBuf {
        crate::marker::marker_path(&self.state_dir)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{}`: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },

    #[error("config parse error in `{}`: {source}", path.display())]
    Parse { path: PathBuf, source: toml::de::Error },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> {
        let map: HashMap<String, OsString> =
            pairs.iter().map(|(k, v)| (k.to_string(), OsString::from(v))).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_target_local_influx() {
        let cfg = BootstrapConfig::default();
        assert_eq!(cfg.host, "http://localhost:8086");
        assert_eq!(cfg.daemon.binary, PathBuf::from("influxd"));
        assert_eq!(cfg.daemon.log_file, PathBuf::from("influxd.log"));
        assert_eq!(cfg.cli.binary, PathBuf::from("influx"));
        assert_eq!(cfg.readiness.timeout(), Duration::from_secs(40));
        assert_eq!(cfg.readiness.poll_interval(), Duration::from_millis(500));
        assert_eq!(cfg.on_already_initialized, AlreadyInitializedPolicy::Skip);
        assert!(cfg.installer_script.is_none());
    }

    #[test]
    fn parse_from_toml() {
        let toml_str = r#"
credentials_file = "/workspace/credentials.toml"
host = "http://influx:8086"
on_already_initialized = "fail"
installer_script = "/home/dev/bootstrap.sh"

[daemon]
binary = "/usr/bin/influxd"
args = ["--reporting-disabled"]

[readiness]
timeout_secs = 90
poll_interval_ms = 250
"#;
        let cfg: BootstrapConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.credentials_file, PathBuf::from("/workspace/credentials.toml"));
        assert_eq!(cfg.host, "http://influx:8086");
        assert_eq!(cfg.on_already_initialized, AlreadyInitializedPolicy::Fail);
        assert_eq!(cfg.daemon.args, vec!["--reporting-disabled".to_string()]);
        assert_eq!(cfg.daemon.log_file, PathBuf::from("influxd.log")); // default
        assert_eq!(cfg.readiness.timeout_secs, 90);
        assert_eq!(cfg.cli.timeout_secs, 30); // default
    }

    #[test]
    fn rejects_unknown_keys() {
        let error = toml::from_str::<BootstrapConfig>("sleep_secs = 40\n").expect_err("should fail");
        assert!(error.to_string().contains("unknown field `sleep_secs`"));
    }

    #[test]
    fn empty_toml_is_default() {
        let cfg: BootstrapConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, BootstrapConfig::default());
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let cfg = ReadinessConfig { timeout_secs: 1, poll_interval_ms: 0 };
        assert_eq!(cfg.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn missing_default_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = BootstrapConfig::resolve_with_env(
            &ConfigOverrides::default(),
            Some(dir.path().join("config.toml")),
            env_from(&[]),
        )
        .unwrap();
        assert_eq!(cfg, BootstrapConfig::default());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let overrides = ConfigOverrides {
            config_path: Some(dir.path().join("nope.toml")),
            credentials_file: None,
        };
        let error =
            BootstrapConfig::resolve_with_env(&overrides, None, env_from(&[])).unwrap_err();
        assert!(matches!(error, ConfigError::Io { .. }));
    }

    #[test]
    fn env_config_path_is_used() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("boot.toml");
        std::fs::write(&path, "host = \"http://from-file:8086\"\n").unwrap();

        let cfg = BootstrapConfig::resolve_with_env(
            &ConfigOverrides::default(),
            None,
            env_from(&[(CONFIG_ENV, path.to_str().unwrap())]),
        )
        .unwrap();
        assert_eq!(cfg.host, "http://from-file:8086");
    }

    #[test]
    fn layering_order_is_file_then_env_then_flags() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "credentials_file = \"/from/file.toml\"\nhost = \"http://from-file:8086\"\n",
        )
        .unwrap();

        let env = env_from(&[
            (CREDENTIALS_ENV, "/from/env.toml"),
            (HOST_ENV, "http://from-env:8086"),
        ]);
        let cfg =
            BootstrapConfig::resolve_with_env(&ConfigOverrides::default(), Some(path.clone()), &env)
                .unwrap();
        assert_eq!(cfg.credentials_file, PathBuf::from("/from/env.toml"));
        assert_eq!(cfg.host, "http://from-env:8086");

        let overrides = ConfigOverrides {
            config_path: None,
            credentials_file: Some(PathBuf::from("/from/flag.toml")),
        };
        let cfg = BootstrapConfig::resolve_with_env(&overrides, Some(path), &env).unwrap();
        assert_eq!(cfg.credentials_file, PathBuf::from("/from/flag.toml"));
    }

    #[test]
    fn parse_error_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "host = \n").unwrap();
        let error = BootstrapConfig::load_from(&path).unwrap_err();
        assert!(matches!(error, ConfigError::Parse { .. }));
        assert!(error.to_string().contains("config.toml"));
    }
}
