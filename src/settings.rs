//! Settings persistence using TOML
//!
//! Stores settings in ~/.config/almost-tetris/settings.toml (or platform equivalent)

use crate::board::{BOARD_HEIGHT, BOARD_WIDTH};
use crate::game::EngineConfig;
use crate::piece::DEFAULT_FALL_SPEED;
use crate::replay::ReplayFormat;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Simulation settings
    pub engine: EngineSettings,
    /// Recording and playback
    pub replay: ReplaySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Engine time per tick in milliseconds
    pub tick_ms: u64,
    /// Rows per second
    pub fall_speed: f32,
    /// Fixed randomizer seed, random when unset
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaySettings {
    /// Record every game
    pub record: bool,
    /// Where recordings are written
    pub path: PathBuf,
    /// Playback speed preset, see `SPEED_PRESETS`
    pub speed: i32,
    pub format: ReplayFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Extra `tracing` filter directive, e.g. "almost_tetris=trace"
    pub filter: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            fall_speed: DEFAULT_FALL_SPEED,
            seed: None,
        }
    }
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            record: true,
            path: PathBuf::from("replay.trs"),
            speed: 1,
            format: ReplayFormat::Binary,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "almost_tetris=debug".to_string(),
        }
    }
}

impl Settings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        ProjectDirs::from("com", "almost-tetris", "almost-tetris")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.toml"))
    }

    /// Load settings from the config directory, or defaults
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load settings from `path`. A missing or malformed file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed settings {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save settings to the config directory
    pub fn save(&self) -> Result<(), String> {
        let Some(path) = Self::settings_path() else {
            return Err("Could not determine settings path".to_string());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        // Create directory if needed
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| format!("Failed to create config dir: {}", e))?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize: {}", e))?;

        fs::write(path, contents).map_err(|e| format!("Failed to write settings: {}", e))?;

        Ok(())
    }

    /// Engine parameters for a standard-size grid
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            width: BOARD_WIDTH,
            height: BOARD_HEIGHT,
            tick: Duration::from_millis(self.engine.tick_ms.max(1)),
            fall_speed: self.engine.fall_speed,
            seed: self.engine.seed,
            record: self.replay.record,
        }
    }
}
