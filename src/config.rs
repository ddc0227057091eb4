//! Application-level configuration loading: default scoring policy and reconciliation health thresholds.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::dao::models::ScoringPolicy;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CLUB_SEEDING_CONFIG_PATH";
/// Scoring policy applied to tournaments created without an explicit one.
const DEFAULT_SCORING: ScoringPolicy = ScoringPolicy::Fixed {
    winner_points: 5,
    loser_points: 3,
};

#[derive(Debug, Clone, Copy, PartialEq)]
/// Bounds under which a non-zero mismatch count is still reported as a warning.
pub struct HealthThresholds {
    /// Mismatch counts strictly below this value are a warning.
    pub warning_max_count: usize,
    /// Mismatch percentages strictly below this value are a warning.
    pub warning_max_percentage: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            warning_max_count: 5,
            warning_max_percentage: 5.0,
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    default_scoring: ScoringPolicy,
    health: HealthThresholds,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        scoring = ?app_config.default_scoring,
                        "loaded seeding configuration"
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

    /// Parse a configuration document; omitted sections keep their defaults.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Build a configuration from explicit values.
    pub fn new(default_scoring: ScoringPolicy, health: HealthThresholds) -> Self {
        Self {
            default_scoring,
            health,
        }
    }

    /// Scoring policy for tournaments that do not pick one.
    pub fn default_scoring(&self) -> ScoringPolicy {
        self.default_scoring
    }

    /// Thresholds used to classify reconciliation health.
    pub fn health_thresholds(&self) -> HealthThresholds {
        self.health
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_scoring: DEFAULT_SCORING,
            health: HealthThresholds::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    scoring: Option<ScoringPolicy>,
    #[serde(default)]
    health: Option<RawHealth>,
}

#[derive(Debug, Deserialize)]
struct RawHealth {
    warning_max_count: usize,
    warning_max_percentage: f64,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            default_scoring: value.scoring.unwrap_or(DEFAULT_SCORING),
            health: value
                .health
                .map(|raw| HealthThresholds {
                    warning_max_count: raw.warning_max_count,
                    warning_max_percentage: raw.warning_max_percentage,
                })
                .unwrap_or_default(),
        }
    }
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
    fn empty_document_keeps_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.default_scoring(), DEFAULT_SCORING);
        assert_eq!(config.health_thresholds(), HealthThresholds::default());
    }

    #[test]
    fn games_won_policy_and_thresholds_are_read() {
        let config = AppConfig::from_json(
            r#"{
                "scoring": {"kind": "games_won"},
                "health": {"warning_max_count": 2, "warning_max_percentage": 1.5}
            }"#,
        )
        .unwrap();
        assert_eq!(config.default_scoring(), ScoringPolicy::GamesWon);
        assert_eq!(config.health_thresholds().warning_max_count, 2);
        assert_eq!(config.health_thresholds().warning_max_percentage, 1.5);
    }

    #[test]
    fn fixed_policy_requires_both_amounts() {
        assert!(AppConfig::from_json(r#"{"scoring": {"kind": "fixed", "winner_points": 5}}"#).is_err());
    }
}
