//! Application-level configuration loading: default game settings and extra scripts.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use crate::state::{catalog::ScriptDefinition, game::GameSettings};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CLOCKTOWER_BACK_CONFIG_PATH";

#[derive(Debug, Clone, Default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Settings applied to every new game before caller overrides.
    pub default_settings: GameSettings,
    /// Custom scripts registered next to the built-in ones.
    pub scripts: Vec<ScriptDefinition>,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        scripts = app_config.scripts.len(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    fn parse(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(contents)?;
        let default_settings = raw.default_settings.unwrap_or_default();
        default_settings.validate()?;

        Ok(Self {
            default_settings: default_settings.normalized(),
            scripts: raw.scripts,
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum ConfigError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid default settings: {0}")]
    Settings(#[from] validator::ValidationErrors),
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    default_settings: Option<GameSettings>,
    #[serde(default)]
    scripts: Vec<ScriptDefinition>,
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = AppConfig::parse("{}").unwrap();
        assert_eq!(config.default_settings, GameSettings::default());
        assert!(config.scripts.is_empty());
    }

    #[test]
    fn partial_settings_are_merged_with_defaults() {
        let config = AppConfig::parse(
            r#"{
                "default_settings": { "max_players": 10, "house_rules": { "allow_dead_vote": false } },
                "scripts": [
                    { "id": "starter", "name": "Starter", "roles": ["chef", "imp"] }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.default_settings.max_players, 10);
        assert_eq!(config.default_settings.voting_time, 120);
        assert!(!config.default_settings.house_rules.allow_dead_vote);
        assert!(config.default_settings.house_rules.allow_whispers);
        assert_eq!(config.scripts[0].roles, ["chef", "imp"]);
        assert_eq!(config.scripts[0].player_count_max, 15);
    }

    #[test]
    fn out_of_range_settings_are_rejected() {
        let err = AppConfig::parse(r#"{ "default_settings": { "max_players": 40 } }"#);
        assert!(matches!(err, Err(ConfigError::Settings(_))));
        assert!(matches!(AppConfig::parse("not json"), Err(ConfigError::Json(_))));
    }
}
