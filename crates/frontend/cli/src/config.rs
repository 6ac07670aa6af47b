//! Host settings read from `config.json`

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Audio ring size in samples
    pub audio_buffer_capacity: usize,
    /// Master volume, 0.0-1.0
    pub volume: f32,
    #[serde(default)]
    pub bootrom_path: Option<PathBuf>,
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            audio_buffer_capacity: 8192,
            volume: 0.5,
            bootrom_path: None,
            log_level: None,
        }
    }
}

impl Settings {
    /// `config.json` next to the executable
    pub fn config_path() -> PathBuf {
        let mut path = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        path.push("config.json");
        path
    }

    /// Load from `path` (or the default location), falling back to defaults
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.map_or_else(Self::config_path, Path::to_path_buf);
        match fs::read_to_string(&path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                log::warn!(
                    "Failed to parse {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Settings = serde_json::from_str(contents)?;
        settings.volume = settings.volume.clamp(0.0, 1.0);
        if settings.sample_rate == 0 {
            settings.sample_rate = Self::default().sample_rate;
        }
        Ok(settings)
    }
}
