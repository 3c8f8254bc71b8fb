use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::parser::ParseOptions;

/// Defaults shipped with the crate, checked for TOML syntax by `build.rs`.
const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Styling and parse settings. The document model itself carries no styles;
/// only the renderer reads this.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub parse: ParseOptions,
    pub title: TextStyle,
    pub headings: HeadingsConfig,
    pub code: CodeConfig,
    pub table: TableConfig,
    pub links: LinksConfig,
    pub page: PageConfig,
}

/// Font size in points, hex color, weight.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TextStyle {
    pub size: f64,
    pub color: String,
    pub bold: bool,
}

impl TextStyle {
    fn heading(size: f64) -> Self {
        Self {
            size,
            color: "#003366".to_string(),
            bold: true,
        }
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::heading(28.0)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeadingsConfig {
    pub h1: TextStyle,
    pub h2: TextStyle,
    pub h3: TextStyle,
    pub h4: TextStyle,
}

impl Default for HeadingsConfig {
    fn default() -> Self {
        Self {
            h1: TextStyle::heading(20.0),
            h2: TextStyle::heading(16.0),
            h3: TextStyle::heading(14.0),
            h4: TextStyle::heading(12.0),
        }
    }
}

impl HeadingsConfig {
    /// Style for a heading level. Levels past 4 share the level-4 style.
    pub fn for_level(&self, level: u8) -> &TextStyle {
        match level {
            0 | 1 => &self.h1,
            2 => &self.h2,
            3 => &self.h3,
            _ => &self.h4,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct CodeConfig {
    pub size: f64,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self { size: 9.0 }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TableConfig {
    pub header_fill: String,
    pub header_bold: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            header_fill: "#e6e6e6".to_string(),
            header_bold: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LinksConfig {
    pub color: String,
    pub underline: bool,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            color: "#0563c1".to_string(),
            underline: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct PageConfig {
    pub numbers: bool,
}

impl Config {
    /// The config embedded at compile time.
    pub fn compiled_default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    /// Load config from a TOML file. Missing keys fall back to the defaults.
    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load config from a TOML file, or return defaults if it is missing or invalid.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "using default config");
                Self::compiled_default()
            }
        }
    }
}
