use anyhow::{Context, Result};
use libmdz::CodecConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// file looked for in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "mdz.toml";

/// Contents of an `mdz.toml`
///
/// ```toml
/// [codec]
/// block_size = 512
/// window = "sine"
///
/// [codec.reduction]
/// precision = "half"
/// decimals = 2
/// threshold = 0.1
/// truncate = { start = 150 }
///
/// [output]
/// generate_steps = true
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct OutputConfig {
    /// write every stage, not just the final one
    #[serde(default)]
    pub generate_steps: bool,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
}

/// explicit path, or `mdz.toml` if the working directory has one
pub fn find_config(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        local.exists().then_some(local)
    })
}
