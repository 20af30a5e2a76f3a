//! Packer configuration file handling
//!
//! `fontpack.toml` holds defaults for a packing run. Every value can be
//! overridden from the command line.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory
pub const CONFIG_FILE: &str = "fontpack.toml";

/// Contents of fontpack.toml
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PackConfig {
    #[serde(default)]
    pub atlas: AtlasConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Layout and glyph selection
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct AtlasConfig {
    /// Gap after each column in pixels
    #[serde(default)]
    pub padding: u32,
    /// Literal characters to pack
    #[serde(default)]
    pub chars: Option<String>,
    /// Code point ranges such as "0x20-0x7E"
    #[serde(default)]
    pub ranges: Vec<String>,
    /// Fail on code points the font has no glyph for
    #[serde(default)]
    pub strict: bool,
}

/// Where and what to write
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Output directory (defaults to the working directory)
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Also write the metric table as JSON
    #[serde(default)]
    pub json: bool,
}

impl PackConfig {
    /// Load an explicit config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Load fontpack.toml from `dir` if present, defaults otherwise
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if path.exists() {
            tracing::debug!("Using config {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
