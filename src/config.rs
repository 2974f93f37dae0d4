//! Application-level configuration loading: round timing and scoring knobs.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MINI_MADNESS_CONFIG_PATH";

/// Immutable runtime configuration shared across the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// How long a quiz round accepts answers, in milliseconds.
    pub round_ms: u64,
    /// Length of the pre-round countdown shown on every client, in seconds.
    pub countdown_seconds: u32,
    /// Breather between a round's results and the next countdown, in
    /// milliseconds.
    pub intermission_ms: u64,
    /// Points awarded for any correct answer before the speed bonus.
    pub base_points: u32,
    /// Maximum speed bonus, scaled linearly by the time remaining.
    pub speed_weight: u32,
    /// Number of characters in a join code.
    pub code_length: usize,
    /// Capacity of each session's change-notification channel.
    pub change_channel_capacity: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            round_ms: 10_000,
            countdown_seconds: 5,
            intermission_ms: 2_500,
            base_points: 50,
            speed_weight: 50,
            code_length: 5,
            change_channel_capacity: 64,
        }
    }
}

impl AppConfig {
    /// Load the configuration from disk, falling back to the baked-in
    /// defaults when the file is absent or unreadable.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded configuration");
                    config
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

    /// Round length as a [`time::Duration`] for deadline arithmetic.
    pub fn round_duration(&self) -> time::Duration {
        time::Duration::milliseconds(self.round_ms as i64)
    }

    /// Intermission delay as a std duration for timer sleeps.
    pub fn intermission_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.intermission_ms)
    }
}

/// JSON representation of the configuration file. Every field is optional so
/// an operator only writes down what they want to change.
#[derive(Debug, Deserialize)]
struct RawConfig {
    round_ms: Option<u64>,
    countdown_seconds: Option<u32>,
    intermission_ms: Option<u64>,
    base_points: Option<u32>,
    speed_weight: Option<u32>,
    code_length: Option<usize>,
    change_channel_capacity: Option<usize>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            round_ms: raw.round_ms.unwrap_or(defaults.round_ms),
            countdown_seconds: raw.countdown_seconds.unwrap_or(defaults.countdown_seconds),
            intermission_ms: raw.intermission_ms.unwrap_or(defaults.intermission_ms),
            base_points: raw.base_points.unwrap_or(defaults.base_points),
            speed_weight: raw.speed_weight.unwrap_or(defaults.speed_weight),
            code_length: raw.code_length.unwrap_or(defaults.code_length),
            change_channel_capacity: raw
                .change_channel_capacity
                .unwrap_or(defaults.change_channel_capacity),
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
    fn partial_raw_config_keeps_defaults_elsewhere() {
        let raw: RawConfig = serde_json::from_str(r#"{"round_ms": 15000}"#).unwrap();
        let config: AppConfig = raw.into();
        assert_eq!(config.round_ms, 15_000);
        assert_eq!(config.countdown_seconds, 5);
        assert_eq!(config.base_points, 50);
    }

    #[test]
    fn round_duration_matches_round_ms() {
        let config = AppConfig::default();
        assert_eq!(config.round_duration().whole_milliseconds(), 10_000);
    }
}
