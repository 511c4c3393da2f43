//! Configuration for aumix
//!
//! - YAML loading/saving for any serde type
//! - Default config locations
//! - Resampler tuning
//!
//! The output backend's own settings live in [`crate::audio::AudioConfig`],
//! which embeds a [`ResamplerConfig`].

mod io;
mod paths;
mod resampler;

pub use io::{load_config, load_config_strict, save_config};
pub use paths::{default_config_dir, default_config_path};
pub use resampler::ResamplerConfig;

/// File name of the main config file
pub const CONFIG_FILE_NAME: &str = "config.yaml";
