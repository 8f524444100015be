//! Server and world configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! command-line flags. A config file looks like:
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 5000
//! max_clients = 32
//!
//! [world]
//! width = 40
//! height = 40
//! visibility = 10
//! repair_duration = 5
//! reload_duration = 5
//! max_shields = 3
//! max_shots = 3
//! obstacles = "M-2,2:4,4 BP-10,1:10,3"
//! ```

use crate::maze::ObstacleMode;
use crate::obstacle::ObstacleParseError;
use clap::Parser;
use serde::Deserialize;
use shared::Position;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid obstacle layout: {0}")]
    Obstacles(#[from] ObstacleParseError),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("{field} must be at most {max}")]
    TooLarge { field: &'static str, max: u32 },
    #[error("obstacle {0} lies outside the world")]
    ObstacleOutside(String),
}

/// Largest accepted world width or height.
pub const MAX_DIMENSION: u32 = 10_000;

/// Rules of the world shared by every robot.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub width: u32,
    pub height: u32,
    /// How far `look` reaches, in tiles.
    pub visibility: u32,
    /// Seconds a robot is busy while repairing.
    pub repair_duration: u64,
    /// Seconds a robot is busy while reloading.
    pub reload_duration: u64,
    /// Shield capacity of a `hitbot`.
    pub max_shields: u32,
    /// Magazine size of a `hitbot`.
    pub max_shots: u32,
    pub obstacles: ObstacleMode,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 20,
            height: 20,
            visibility: 10,
            repair_duration: 5,
            reload_duration: 5,
            max_shields: 3,
            max_shots: 3,
            obstacles: ObstacleMode::Random,
        }
    }
}

impl WorldConfig {
    pub fn repair_time(&self) -> Duration {
        Duration::from_secs(self.repair_duration)
    }

    pub fn reload_time(&self) -> Duration {
        Duration::from_secs(self.reload_duration)
    }

    /// Bottom-right tile of a world this size. The top-left is the origin.
    pub fn bottom_right(&self) -> Position {
        Position::new(last_index(self.width), last_index(self.height))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 {
            return Err(ConfigError::Zero("world.width"));
        }
        if self.height == 0 {
            return Err(ConfigError::Zero("world.height"));
        }
        if self.visibility == 0 {
            return Err(ConfigError::Zero("world.visibility"));
        }
        if self.width > MAX_DIMENSION {
            return Err(ConfigError::TooLarge {
                field: "world.width",
                max: MAX_DIMENSION,
            });
        }
        if self.height > MAX_DIMENSION {
            return Err(ConfigError::TooLarge {
                field: "world.height",
                max: MAX_DIMENSION,
            });
        }

        if let ObstacleMode::Fixed(obstacles) = &self.obstacles {
            let (top_left, bottom_right) = (Position::new(0, 0), self.bottom_right());
            if let Some(outside) = obstacles.iter().find(|obstacle| {
                !obstacle.top_left().is_in(top_left, bottom_right)
                    || !obstacle.bottom_right().is_in(top_left, bottom_right)
            }) {
                return Err(ConfigError::ObstacleOutside(outside.to_string()));
            }
        }
        Ok(())
    }
}

/// Highest tile index along an axis of `size` tiles.
pub(crate) fn last_index(size: u32) -> i32 {
    i32::try_from(size).unwrap_or(i32::MAX).saturating_sub(1)
}

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_clients: usize,
    pub world: WorldConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: shared::DEFAULT_HOST.to_string(),
            port: shared::DEFAULT_PORT,
            max_clients: 32,
            world: WorldConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads a TOML file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, optionally overlaid with a file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_clients == 0 {
            return Err(ConfigError::Zero("max_clients"));
        }
        self.world.validate()
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Command line of the server binary. Every flag overrides the config file.
#[derive(Parser, Debug, Default)]
#[clap(author, version, about = "Robot Worlds server")]
pub struct CliArgs {
    /// TOML config file
    #[clap(short, long)]
    pub config: Option<PathBuf>,
    /// Server IP address to bind to
    #[clap(short = 'H', long)]
    pub host: Option<String>,
    /// Server port to listen on
    #[clap(short, long)]
    pub port: Option<u16>,
    /// Maximum number of simultaneous connections
    #[clap(long)]
    pub max_clients: Option<usize>,
    /// World size as a single number for a square world
    #[clap(short, long)]
    pub size: Option<u32>,
    /// World width, applied after --size
    #[clap(long)]
    pub width: Option<u32>,
    /// World height, applied after --size
    #[clap(long)]
    pub height: Option<u32>,
    /// Visibility range in tiles
    #[clap(short, long)]
    pub visibility: Option<u32>,
    /// Repair duration in seconds
    #[clap(long)]
    pub repair: Option<u64>,
    /// Reload duration in seconds
    #[clap(long)]
    pub reload: Option<u64>,
    /// Shield capacity of a hitbot
    #[clap(long)]
    pub max_shields: Option<u32>,
    /// Magazine size of a hitbot
    #[clap(long)]
    pub max_shots: Option<u32>,
    /// Obstacles: "none", "random", a count, or a list like "M-1,1:3,3 BP-5,5:6,6"
    #[clap(short, long)]
    pub obstacles: Option<String>,
}

impl CliArgs {
    /// Builds the final configuration: defaults, then file, then flags.
    pub fn resolve(&self) -> Result<ServerConfig, ConfigError> {
        let mut config = ServerConfig::load(self.config.as_deref())?;
        self.apply(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply(&self, config: &mut ServerConfig) -> Result<(), ConfigError> {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(max_clients) = self.max_clients {
            config.max_clients = max_clients;
        }

        let world = &mut config.world;
        if let Some(size) = self.size {
            world.width = size;
            world.height = size;
        }
        if let Some(width) = self.width {
            world.width = width;
        }
        if let Some(height) = self.height {
            world.height = height;
        }
        if let Some(visibility) = self.visibility {
            world.visibility = visibility;
        }
        if let Some(repair) = self.repair {
            world.repair_duration = repair;
        }
        if let Some(reload) = self.reload {
            world.reload_duration = reload;
        }
        if let Some(max_shields) = self.max_shields {
            world.max_shields = max_shields;
        }
        if let Some(max_shots) = self.max_shots {
            world.max_shots = max_shots;
        }
        if let Some(obstacles) = &self.obstacles {
            world.obstacles = obstacles.parse()?;
        }
        Ok(())
    }
}
