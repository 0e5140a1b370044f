use std::path::Path;

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

/// Settings read from an optional TOML file. Command line flags take precedence.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DisassemblerConfig {
    /// reject code containing unrecognized opcodes
    pub strict: bool,
    /// print the Keccak-256 of the code after the listing
    pub show_hash: bool,
    /// used when `RUST_LOG` is not set
    pub log_level: LevelFilter,
}

impl Default for DisassemblerConfig {
    fn default() -> Self {
        Self {
            strict: false,
            show_hash: true,
            log_level: LevelFilter::Info,
        }
    }
}

impl DisassemblerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        assert_eq!(DisassemblerConfig::from_toml("").unwrap(), DisassemblerConfig::default());
    }

    #[test]
    fn partial_file() {
        let config = DisassemblerConfig::from_toml("strict = true\nlog_level = \"debug\"\n").unwrap();
        assert!(config.strict);
        assert!(config.show_hash);
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn unknown_level_is_an_error() {
        assert!(DisassemblerConfig::from_toml("log_level = \"loud\"").is_err());
    }
}
