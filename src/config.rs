use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::export::ExportFormat;

const CONFIG_FILE: &str = "photogrid_config.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub window: WindowConfig,
    pub grid: GridConfig,
    pub display: DisplayConfig,
    pub export: ExportConfig,
    pub notifications: NotificationConfig,
    pub paths: PathConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Edge length of one slot, in points.
    pub slot_size: f32,
    pub gap: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Longest texture edge uploaded to the GPU.
    pub max_texture_edge: u32,
    pub preview_size: f32,
    pub thumbnail_size: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub app_name: String,
    pub format: ExportFormat,
    pub jpeg_quality: u8,
    pub canvas_width: u32,
    pub strip_height: u32,
    pub background: [u8; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub toast_duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    pub export_dir: PathBuf,
    pub config_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowConfig {
                title: "Photo Grid".to_string(),
                width: 1024,
                height: 860,
            },
            grid: GridConfig {
                slot_size: 220.0,
                gap: 8.0,
            },
            display: DisplayConfig {
                max_texture_edge: 1024,
                preview_size: 480.0,
                thumbnail_size: 64.0,
            },
            export: ExportConfig {
                app_name: "photo-grid".to_string(),
                format: ExportFormat::Png,
                jpeg_quality: 90,
                canvas_width: 1080,
                strip_height: 180,
                background: [24, 24, 24],
            },
            notifications: NotificationConfig {
                toast_duration_ms: 3000,
            },
            paths: PathConfig {
                export_dir: PathBuf::from("exports"),
                config_file: PathBuf::from(CONFIG_FILE),
            },
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from(CONFIG_FILE);

        if config_path.exists() {
            Self::load_from_file(&config_path)
        } else {
            log::info!("Config file not found, creating default configuration");
            let default_config = Self::default();
            default_config.save()?;
            Ok(default_config)
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| "Failed to parse configuration file")?;

        log::info!("Configuration loaded from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to_file(&self.paths.config_file)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        std::fs::write(path.as_ref(), contents)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        log::info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(anyhow::anyhow!("Invalid window dimensions"));
        }

        if self.grid.slot_size <= 0.0 || self.grid.gap < 0.0 {
            return Err(anyhow::anyhow!("Invalid grid geometry"));
        }

        if self.display.max_texture_edge == 0
            || self.display.preview_size <= 0.0
            || self.display.thumbnail_size <= 0.0
        {
            return Err(anyhow::anyhow!("Invalid display sizes"));
        }

        if self.export.app_name.trim().is_empty() {
            return Err(anyhow::anyhow!("Export app name must not be empty"));
        }

        if !(1..=100).contains(&self.export.jpeg_quality) {
            return Err(anyhow::anyhow!(
                "Invalid JPEG quality: {}",
                self.export.jpeg_quality
            ));
        }

        // Room for padding plus at least a one pixel photo.
        if self.export.canvas_width < 64 || self.export.strip_height < 40 {
            return Err(anyhow::anyhow!(
                "Export canvas too small: {}x{}",
                self.export.canvas_width,
                self.export.strip_height
            ));
        }

        if self.notifications.toast_duration_ms == 0 {
            return Err(anyhow::anyhow!("Toast duration must be positive"));
        }

        Ok(())
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_millis(self.notifications.toast_duration_ms)
    }

    /// Points needed to draw the whole 3x3 grid.
    pub fn grid_edge(&self) -> f32 {
        self.grid.slot_size * 3.0 + self.grid.gap * 2.0
    }
}

// Configuration builder for easier setup
#[cfg(test)]
pub struct ConfigBuilder {
    config: Config,
}

#[cfg(test)]
impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn window_size(mut self, width: u32, height: u32) -> Self {
        self.config.window.width = width;
        self.config.window.height = height;
        self
    }

    pub fn slot_size(mut self, slot_size: f32) -> Self {
        self.config.grid.slot_size = slot_size;
        self
    }

    pub fn app_name(mut self, name: &str) -> Self {
        self.config.export.app_name = name.to_string();
        self
    }

    pub fn export_format(mut self, format: ExportFormat) -> Self {
        self.config.export.format = format;
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.export.jpeg_quality = quality;
        self
    }

    pub fn export_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.paths.export_dir = dir.into();
        self
    }

    pub fn toast_duration_ms(mut self, millis: u64) -> Self {
        self.config.notifications.toast_duration_ms = millis;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
