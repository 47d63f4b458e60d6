use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_core::SchedulerConfig;
use serde::Deserialize;
use space::position::HEIGHT_LEVELS;
use space::Position;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid bind address '{0}'")]
    BindAddr(String),
    #[error("spawn height {0} out of range")]
    SpawnHeight(u8),
    #[error("{0}")]
    Usage(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetSection {
    pub bind_addr: String,
    pub max_connections_per_ip: usize,
    pub idle_timeout_secs: u64,
}

impl Default for NetSection {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:43594".to_string(),
            max_connections_per_ip: 5,
            idle_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorldSection {
    pub spawn_x: i32,
    pub spawn_y: i32,
    pub spawn_height: u8,
    pub parallel_updates: bool,
    /// 0 uses the available hardware parallelism.
    pub update_threads: usize,
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            spawn_x: 3222,
            spawn_y: 3218,
            spawn_height: 0,
            parallel_updates: true,
            update_threads: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoginSection {
    pub database_path: String,
    pub register_unknown_accounts: bool,
    pub client_version: u16,
}

impl Default for LoginSection {
    fn default() -> Self {
        Self {
            database_path: "data/accounts.db".to_string(),
            register_unknown_accounts: true,
            client_version: 317,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerSection {
    pub base_tick_ms: u64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self { base_tick_ms: 100 }
    }
}

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub net: NetSection,
    pub world: WorldSection,
    pub login: LoginSection,
    pub scheduler: SchedulerSection,
}

impl ServerConfig {
    /// Load configuration from an optional TOML file path.
    /// Falls back to defaults if path is None or file doesn't exist.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                toml::from_str(&content).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.net
            .bind_addr
            .parse()
            .map_err(|_| ConfigError::BindAddr(self.net.bind_addr.clone()))
    }

    pub fn spawn(&self) -> Result<Position, ConfigError> {
        let world = &self.world;
        if world.spawn_height >= HEIGHT_LEVELS {
            return Err(ConfigError::SpawnHeight(world.spawn_height));
        }
        Ok(Position::new(world.spawn_x, world.spawn_y, world.spawn_height))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.net.idle_timeout_secs)
    }

    pub fn to_scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            base_tick: Duration::from_millis(self.scheduler.base_tick_ms.max(1)),
            max_pulses: 0,
        }
    }
}

/// Parses `--config <path>` from the command line and loads the file.
pub fn parse_cli_args(args: impl IntoIterator<Item = String>) -> Result<ServerConfig, ConfigError> {
    let mut args = args.into_iter().skip(1);
    let mut config_path: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => match args.next() {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => return Err(ConfigError::Usage("--config requires a path argument".to_string())),
            },
            other => return Err(ConfigError::Usage(format!("unknown argument: {other}"))),
        }
    }

    ServerConfig::load(config_path.as_deref())
}
