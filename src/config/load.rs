use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::types::AtlasConfig;

/// A loaded configuration file with its associated directory.
///
/// Paths in the config are relative to the config file location,
/// so we need to track where the config was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The parsed configuration
    pub config: AtlasConfig,
    /// The directory containing the config file
    pub config_dir: PathBuf,
}

impl LoadedConfig {
    /// Load a config file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        let config = Self::parse(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;

        let config_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Self { config, config_dir })
    }

    fn parse(content: &str) -> Result<AtlasConfig> {
        let config: AtlasConfig = serde_json::from_str(content)?;
        if config.version != 1 {
            anyhow::bail!("unsupported config version {}", config.version);
        }
        Ok(config)
    }

    /// Sprite sheet base path resolved against the config file directory.
    pub fn resolve_sprite(&self) -> Option<String> {
        self.config.sprite.as_ref().map(|sprite| {
            self.config_dir
                .join(sprite)
                .to_string_lossy()
                .into_owned()
        })
    }

    /// Resolve the output directory relative to the config file directory.
    pub fn resolve_output_dir(&self) -> PathBuf {
        self.config_dir.join(&self.config.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompressConfig;

    fn loaded(json: &str) -> LoadedConfig {
        LoadedConfig {
            config: LoadedConfig::parse(json).unwrap(),
            config_dir: PathBuf::from("/project/styles"),
        }
    }

    #[test]
    fn test_defaults_fill_missing_fields() {
        let lc = loaded(r#"{ "sprite": "sprites/streets" }"#);

        assert_eq!(lc.config.name, "atlas");
        assert_eq!(lc.config.max_width, 4096);
        assert_eq!(lc.config.pixel_ratio, 1.0);
        assert_eq!(lc.config.variant, "icon");
        assert!(lc.config.only.is_empty());
    }

    #[test]
    fn test_paths_resolve_against_config_dir() {
        let lc = loaded(r#"{ "sprite": "sprites/streets", "output_dir": "out" }"#);

        assert_eq!(
            lc.resolve_sprite().as_deref(),
            Some("/project/styles/sprites/streets")
        );
        assert_eq!(lc.resolve_output_dir(), PathBuf::from("/project/styles/out"));
    }

    #[test]
    fn test_compress_forms() {
        let lc = loaded(r#"{ "compress": 4 }"#);
        assert!(matches!(lc.config.compress, Some(CompressConfig::Level(4))));

        let lc = loaded(r#"{ "compress": "max" }"#);
        assert!(matches!(lc.config.compress, Some(CompressConfig::Max(_))));
    }

    #[test]
    fn test_rejects_unknown_version() {
        assert!(LoadedConfig::parse(r#"{ "version": 2 }"#).is_err());
    }
}
