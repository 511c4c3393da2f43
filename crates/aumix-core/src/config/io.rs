//! YAML config file I/O
//!
//! Works with any serde type. Missing or broken files fall back to defaults in
//! [`load_config`]; [`load_config_strict`] reports them instead, for paths the
//! user named explicitly.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Load a config file, falling back to `T::default()`
///
/// A missing file is normal (first run). An unreadable or unparsable file is
/// logged as a warning.
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        log::info!("No config at {:?}, using defaults", path);
        return T::default();
    }

    match load_config_strict(path) {
        Ok(config) => {
            log::info!("Loaded config from {:?}", path);
            config
        }
        Err(e) => {
            log::warn!("Ignoring config {:?}: {:#}", path, e);
            T::default()
        }
    }
}

/// Load a config file, failing if it is missing or invalid
pub fn load_config_strict<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    serde_yaml::from_str(&contents).with_context(|| format!("Invalid config file {:?}", path))
}

/// Write a config file as YAML, creating parent directories
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
    std::fs::write(path, yaml).with_context(|| format!("Failed to write config {:?}", path))?;

    log::info!("Saved config to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResamplerConfig;

    #[test]
    fn test_missing_file_gives_default() {
        let config: ResamplerConfig = load_config(Path::new("/nonexistent/aumix/config.yaml"));
        assert_eq!(config, ResamplerConfig::default());
    }

    #[test]
    fn test_strict_reports_missing_file() {
        let result: Result<ResamplerConfig> =
            load_config_strict(Path::new("/nonexistent/aumix/config.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("resampler.yaml");

        let config = ResamplerConfig {
            sinc_len: 48,
            chunk_frames: 256,
            ..ResamplerConfig::default()
        };
        save_config(&config, &path).unwrap();

        let loaded: ResamplerConfig = load_config(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_garbage_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "sinc_len: [not, a, number").unwrap();

        let loaded: ResamplerConfig = load_config(&path);
        assert_eq!(loaded, ResamplerConfig::default());
        assert!(load_config_strict::<ResamplerConfig>(&path).is_err());
    }
}
