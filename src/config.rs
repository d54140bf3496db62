use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How long the inline strategy is given to lay out before its size is
/// measured. Only used when the host cannot report an explicit rendered
/// signal.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(300);

const DEFAULT_FOREGROUND: &str = "#333";
const DEFAULT_FALLBACK_SIZE: u32 = 24;
const DEFAULT_FILENAME: &str = "icon.svg";

/// Engine settings, passed explicitly to everything that needs them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Colour token injected as the root `color`, which `currentColor` fills resolve to.
    #[serde(default = "default_foreground")]
    pub foreground: String,
    /// Side of the square viewBox used when the root carries no usable size.
    #[serde(default = "default_fallback_size")]
    pub fallback_size: u32,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_filename")]
    pub default_filename: String,
    /// Log cascade transitions at `info` instead of `debug`.
    #[serde(default)]
    pub debug: bool,
}

fn default_foreground() -> String {
    DEFAULT_FOREGROUND.to_string()
}
fn default_fallback_size() -> u32 {
    DEFAULT_FALLBACK_SIZE
}
fn default_settle_delay_ms() -> u64 {
    DEFAULT_SETTLE_DELAY.as_millis() as u64
}
fn default_filename() -> String {
    DEFAULT_FILENAME.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            foreground: default_foreground(),
            fallback_size: default_fallback_size(),
            settle_delay_ms: default_settle_delay_ms(),
            default_filename: default_filename(),
            debug: false,
        }
    }
}

impl EngineConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Reads a config file, trying TOML first and then YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        match Self::from_toml(&content) {
            Ok(config) => Ok(config),
            Err(toml_err) => Self::from_yaml(&content).map_err(|yaml_err| {
                tracing::debug!(%toml_err, "config is not TOML");
                yaml_err
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::EngineConfig;
    use std::time::Duration;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = EngineConfig::from_toml("foreground = \"#000\"").expect("toml");
        assert_eq!(config.foreground, "#000");
        assert_eq!(config.fallback_size, 24);
        assert_eq!(config.settle_delay(), Duration::from_millis(300));
        assert_eq!(config.default_filename, "icon.svg");
        assert!(!config.debug);
    }

    #[test]
    fn yaml_and_toml_agree() {
        let toml = EngineConfig::from_toml("settle_delay_ms = 50\ndebug = true").expect("toml");
        let yaml = EngineConfig::from_yaml("settle_delay_ms: 50\ndebug: true").expect("yaml");
        assert_eq!(toml, yaml);
    }

    #[test]
    fn from_file_accepts_yaml() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("engine.yaml");
        std::fs::write(&path, "foreground: \"#123456\"\nfallback_size: 16\n").expect("write");

        let config = EngineConfig::from_file(&path).expect("yaml file");
        assert_eq!(config.foreground, "#123456");
        assert_eq!(config.fallback_size, 16);
    }
}
