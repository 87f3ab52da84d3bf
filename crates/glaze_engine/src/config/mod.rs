//! Configuration system
//!
//! Any serde type with a default can be loaded from or saved to `.toml` and
//! `.ron` files through [`Config`]. [`SyncConfig`] carries the synchronizer
//! settings; label parameter presets use the same trait.

use std::path::{Path, PathBuf};
use std::time::Duration;

pub use serde::{Deserialize, Serialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match ConfigFormat::of(path)? {
            ConfigFormat::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match ConfigFormat::of(path)? {
            ConfigFormat::Toml => {
                toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
            }
            ConfigFormat::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents)?;
        Ok(())
    }
}

enum ConfigFormat {
    Toml,
    Ron,
}

impl ConfigFormat {
    fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// When to recompute vertex normals after a material swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalRecomputePolicy {
    /// After every swap
    #[default]
    Always,
    /// Only when the displacement inputs changed
    OnGeometryChange,
}

/// Material synchronizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Quiescence window for debounced rebuilds, in milliseconds
    pub debounce_window_ms: u64,
    /// Relief texture used for bump and displacement
    pub relief_texture: PathBuf,
    /// Tangent-space normal map
    pub normal_map: PathBuf,
    /// Directories searched for relative texture paths
    pub texture_search_paths: Vec<PathBuf>,
    /// Normal recomputation policy
    pub normal_recompute: NormalRecomputePolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_window_ms: 300,
            relief_texture: PathBuf::from("textures/piastrella.jpg"),
            normal_map: PathBuf::from("textures/normal_map.jpg"),
            texture_search_paths: vec![PathBuf::from(".")],
            normal_recompute: NormalRecomputePolicy::Always,
        }
    }
}

impl Config for SyncConfig {}

impl SyncConfig {
    /// Debounce window as a duration
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::materials::ParameterSet;

    #[test]
    fn test_sync_config_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.toml");

        let config = SyncConfig {
            debounce_window_ms: 120,
            normal_recompute: NormalRecomputePolicy::OnGeometryChange,
            ..Default::default()
        };
        config.save_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("normal_recompute = \"on_geometry_change\""));

        let loaded = SyncConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.debounce_window(), Duration::from_millis(120));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.ron");
        std::fs::write(&path, "(debounce_window_ms: 50)").unwrap();

        let loaded = SyncConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.debounce_window_ms, 50);
        assert_eq!(loaded.relief_texture, PathBuf::from("textures/piastrella.jpg"));
        assert_eq!(loaded.normal_recompute, NormalRecomputePolicy::Always);
    }

    #[test]
    fn test_parameter_preset_ron_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.ron");

        let params = ParameterSet { use_custom_shader: false, roughness: 0.5, ..Default::default() };
        params.save_to_file(&path).unwrap();
        assert_eq!(ParameterSet::load_from_file(&path).unwrap(), params);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.json");
        assert!(matches!(
            SyncConfig::default().save_to_file(&path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        std::fs::write(&path, "{}").unwrap();
        assert!(matches!(
            SyncConfig::load_from_file(&path),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SyncConfig::load_from_file(dir.path().join("absent.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
