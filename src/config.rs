use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::services::probe::ProbeConfig;

const DEFAULT_CONFIG_PATH: &str = "config.toml";
const ENV_PREFIX: &str = "WATCHDOG_";
const ENV_FILES: [&str; 2] = [".env.local", ".env"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid environment override: {0}")]
    Env(#[from] envy::Error),
    #[error("unknown database backend: {0}")]
    UnknownBackend(String),
    #[error("probe.timeout_secs must be greater than zero")]
    ZeroProbeTimeout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub probe: ProbeSettings,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            probe: ProbeSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 50051,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            path: PathBuf::from("watchdog.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// 健康探测超时（秒）
    pub timeout_secs: u64,
    pub systemctl_path: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        let defaults = ProbeConfig::default();
        Self {
            timeout_secs: defaults.timeout.as_secs(),
            systemctl_path: defaults.systemctl_path,
        }
    }
}

impl ProbeSettings {
    pub fn to_probe_config(&self) -> ProbeConfig {
        ProbeConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            systemctl_path: self.systemctl_path.clone(),
        }
    }
}

// 以 WATCHDOG_ 为前缀的环境变量覆盖项
#[derive(Debug, Default, Deserialize)]
pub struct EnvOverrides {
    config: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    database_backend: Option<String>,
    database_path: Option<PathBuf>,
    probe_timeout_secs: Option<u64>,
    systemctl_path: Option<String>,
    log_level: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(envy::prefixed(ENV_PREFIX).from_env()?)
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::prefixed(ENV_PREFIX).from_iter(vars)?)
    }
}

/// 依次尝试加载 `.env.local` 和 `.env`，返回成功加载的文件
pub fn load_env_files() -> Option<PathBuf> {
    for env_file in ENV_FILES {
        match dotenvy::from_filename(env_file) {
            Ok(path) => return Some(path),
            Err(e) if e.not_found() => continue,
            Err(e) => {
                eprintln!("Warning: error loading {env_file}: {e}");
            }
        }
    }
    None
}

impl Config {
    /// 读取配置文件（不存在时使用默认值），再应用环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        let overrides = EnvOverrides::from_env()?;
        let path = overrides
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let config = if path.exists() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.with_overrides(overrides)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let config_str = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&config_str)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(config_str)?)
    }

    pub fn with_overrides(mut self, overrides: EnvOverrides) -> Result<Self, ConfigError> {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(backend) = overrides.database_backend {
            self.database.backend = backend.parse()?;
        }
        if let Some(path) = overrides.database_path {
            self.database.path = path;
        }
        if let Some(timeout_secs) = overrides.probe_timeout_secs {
            self.probe.timeout_secs = timeout_secs;
        }
        if let Some(systemctl_path) = overrides.systemctl_path {
            self.probe.systemctl_path = systemctl_path;
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = log_level;
        }
        self.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.probe.timeout_secs == 0 {
            return Err(ConfigError::ZeroProbeTimeout);
        }
        Ok(self)
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.server.port, 50051);
        assert_eq!(config.database.backend, StoreBackend::Sqlite);
        assert_eq!(config.probe.timeout_secs, 10);
        assert_eq!(config.probe.systemctl_path, "systemctl");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            log_level = "debug"

            [server]
            port = 6000

            [database]
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.listen_address(), "0.0.0.0:6000");
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.database.path, PathBuf::from("watchdog.db"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn env_overrides_win_over_file() {
        let overrides = EnvOverrides::from_vars(vars(&[
            ("WATCHDOG_PORT", "7000"),
            ("WATCHDOG_DATABASE_BACKEND", "Memory"),
            ("WATCHDOG_DATABASE_PATH", "/var/lib/watchdog/state.db"),
            ("WATCHDOG_PROBE_TIMEOUT_SECS", "3"),
            ("UNRELATED", "ignored"),
        ]))
        .unwrap();

        let config = Config::default().with_overrides(overrides).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(
            config.database.path,
            PathBuf::from("/var/lib/watchdog/state.db")
        );
        assert_eq!(
            config.probe.to_probe_config().timeout,
            Duration::from_secs(3)
        );
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let overrides =
            EnvOverrides::from_vars(vars(&[("WATCHDOG_DATABASE_BACKEND", "mysql")])).unwrap();
        assert!(matches!(
            Config::default().with_overrides(overrides),
            Err(ConfigError::UnknownBackend(_))
        ));
    }

    #[test]
    fn zero_probe_timeout_is_rejected() {
        let from_file = Config::from_toml_str("[probe]\ntimeout_secs = 0\n").unwrap();
        assert!(matches!(
            from_file.with_overrides(EnvOverrides::default()),
            Err(ConfigError::ZeroProbeTimeout)
        ));

        let overrides =
            EnvOverrides::from_vars(vars(&[("WATCHDOG_PROBE_TIMEOUT_SECS", "0")])).unwrap();
        assert!(matches!(
            Config::default().with_overrides(overrides),
            Err(ConfigError::ZeroProbeTimeout)
        ));
    }

    #[test]
    fn invalid_port_is_an_env_error() {
        assert!(matches!(
            EnvOverrides::from_vars(vars(&[("WATCHDOG_PORT", "not-a-port")])),
            Err(ConfigError::Env(_))
        ));
    }
}
