//! Standard locations for aumix configuration files

use std::path::PathBuf;

/// Directory holding aumix configuration
///
/// Returns: `<config_dir>/aumix` (e.g. `~/.config/aumix` on Linux), falling back
/// to `./aumix` when the platform reports no config directory.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aumix")
}

/// Default path of a config file
///
/// Returns: `<config_dir>/aumix/{filename}`
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_is_namespaced() {
        assert!(default_config_dir().ends_with("aumix"));
    }

    #[test]
    fn test_config_path_includes_filename() {
        let path = default_config_path("config.yaml");
        assert!(path.ends_with("aumix/config.yaml"));
    }
}
