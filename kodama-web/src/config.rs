use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3100";
const DEFAULT_HEARTBEAT_TIMEOUT_SECS: u64 = 90;

/// Dashboard configuration resolved from file, environment and CLI.
#[derive(Debug, Clone)]
pub struct WebConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub static_dir: Option<PathBuf>,
    pub heartbeat_timeout: Duration,
}

/// Raw TOML file structure for `~/.config/kodama/panel.toml`.
#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    bind_addr: Option<String>,
    data_dir: Option<PathBuf>,
    static_dir: Option<PathBuf>,
    heartbeat_timeout_secs: Option<u64>,
}

/// Default config file location.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("kodama").join("panel.toml"))
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("kodama"))
        .unwrap_or_else(|| PathBuf::from("data"))
}

impl WebConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Priority: environment variables override file values. A missing
    /// config file means defaults.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = config_path.map(Path::to_path_buf).or_else(default_config_path);

        let file_config = match path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config: {}", path.display()))?;
                toml::from_str::<ConfigFile>(&content)
                    .with_context(|| format!("failed to parse config: {}", path.display()))?
            }
            _ => ConfigFile::default(),
        };

        Self::from_file_and_env(file_config, |key| std::env::var(key).ok())
    }

    /// Build config from parsed file values and an environment lookup.
    fn from_file_and_env(
        file_config: ConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let bind_addr = env("KODAMA_BIND_ADDR")
            .or(file_config.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .with_context(|| format!("invalid bind_addr: {bind_addr}"))?;

        let data_dir = env("KODAMA_DATA_DIR")
            .map(PathBuf::from)
            .or(file_config.data_dir)
            .unwrap_or_else(default_data_dir);

        let static_dir = env("KODAMA_STATIC_DIR")
            .map(PathBuf::from)
            .or(file_config.static_dir);

        let heartbeat_timeout_secs = match env("KODAMA_HEARTBEAT_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("invalid KODAMA_HEARTBEAT_TIMEOUT_SECS: {raw}"))?,
            None => file_config
                .heartbeat_timeout_secs
                .unwrap_or(DEFAULT_HEARTBEAT_TIMEOUT_SECS),
        };

        Ok(Self {
            bind_addr,
            data_dir,
            static_dir,
            heartbeat_timeout: Duration::from_secs(heartbeat_timeout_secs),
        })
    }
}
