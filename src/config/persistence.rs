// Persistence module
// Configuration file I/O

use super::settings::PlayerConfig;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "PLAYSYNC";

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "playsync", "playsync")
        .context("Failed to determine project directories")
}

/// Get the configuration file path
pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = project_dirs()?;

    let config_dir = proj_dirs.config_dir();
    fs::create_dir_all(config_dir).context("Failed to create config directory")?;

    Ok(config_dir.join("config.json"))
}

/// Get the preference store file path
pub fn get_preferences_path() -> Result<PathBuf> {
    let proj_dirs = project_dirs()?;

    let data_dir = proj_dirs.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data directory")?;

    Ok(data_dir.join("preferences.json"))
}

/// Load configuration from the default location
pub fn load_config() -> Result<PlayerConfig> {
    let config_path = get_config_path()?;
    load_config_from(&config_path)
}

/// Load configuration from a JSON file, layering `PLAYSYNC__SECTION__KEY`
/// environment overrides on top. A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<PlayerConfig> {
    if !path.exists() {
        tracing::info!("Config file not found at {:?}, using defaults", path);
    }

    let settings = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()
        .context("Failed to read config sources")?;

    let config: PlayerConfig = settings
        .try_deserialize()
        .context("Failed to parse config file")?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    tracing::info!("Loaded config from {:?}", path);
    Ok(config)
}

/// Save configuration to the default location
pub fn save_config(config: &PlayerConfig) -> Result<()> {
    let config_path = get_config_path()?;
    save_config_to(config, &config_path)
}

/// Save configuration to a JSON file
pub fn save_config_to(config: &PlayerConfig, path: &Path) -> Result<()> {
    let contents = serde_json::to_string_pretty(config).context("Failed to serialize config")?;

    fs::write(path, contents).context("Failed to write config file")?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");

        let mut config = PlayerConfig::default();
        config.gateway.base_url = Some("https://api.example.com/".to_string());
        config.sync.min_save_gap_secs = 8.0;
        config.playback.loop_preview = true;

        save_config_to(&config, &config_path).unwrap();
        let loaded = load_config_from(&config_path).unwrap();

        assert_eq!(
            loaded.gateway.base_url.as_deref(),
            Some("https://api.example.com/")
        );
        assert_eq!(loaded.sync.min_save_gap_secs, 8.0);
        assert_eq!(loaded.sync.min_position_delta_secs, 5.0);
        assert!(loaded.playback.loop_preview);
    }

    #[test]
    fn test_load_nonexistent_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config_from(&temp_dir.path().join("missing.json")).unwrap();
        assert_eq!(config.resume.min_resume_secs, 120.0);
    }

    #[test]
    fn test_load_invalid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.json");
        fs::write(&config_path, r#"{"resume": {"completed_percent": 0.0}}"#).unwrap();
        assert!(load_config_from(&config_path).is_err());
    }

    #[test]
    fn test_config_path() {
        let path = get_config_path();
        assert!(path.is_ok());
        let path = path.unwrap();
        assert!(path.to_string_lossy().contains("playsync"));
        assert!(path.to_string_lossy().ends_with("config.json"));
    }
}
