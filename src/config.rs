use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::error::Error;

const CONFIG_FILE_NAME: &str = "config.toml";

/// Fully resolved settings for one invocation. Every field is concrete;
/// construction fails rather than letting an unresolved value reach the API.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

/// Call-site overrides, each taking precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
}

/// The persisted config file: an `[API]` section holding the key and a
/// `[CONFIG]` section holding the default model and token limit.
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(rename = "API", default)]
    api: ApiSection,
    #[serde(rename = "CONFIG", default)]
    config: ConfigSection,
}

#[derive(Debug, Deserialize, Default)]
struct ApiSection {
    key: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ConfigSection {
    default_model: Option<String>,
    // Accepts either a bare integer or a quoted string; strings are parsed
    // at resolution time so a bad value is reported, not swallowed.
    max_tokens: Option<toml::Value>,
}

impl Config {
    /// Resolves the effective configuration from the overrides and the
    /// config file. Read-only with respect to the file; no global state.
    pub fn resolve(overrides: Overrides) -> Result<Self, Error> {
        Self::resolve_with(overrides, Self::load_file_config())
    }

    fn resolve_with(overrides: Overrides, file: FileConfig) -> Result<Self, Error> {
        let api_key = overrides
            .api_key
            .or(file.api.key)
            .filter(|key| !key.is_empty())
            .ok_or(Error::MissingApiKey)?;

        let model = overrides
            .model
            .or(file.config.default_model)
            .ok_or(Error::MissingModel)?;

        let max_tokens = match overrides.max_tokens {
            Some(n) => n,
            None => {
                let stored = file.config.max_tokens.ok_or(Error::MissingMaxTokens)?;
                parse_max_tokens(&stored)?
            }
        };

        Ok(Config {
            api_key,
            model,
            max_tokens,
            // Sampling parameters are call-site only; the file is not consulted.
            temperature: overrides.temperature.unwrap_or(0.0),
            top_p: overrides.top_p.unwrap_or(1.0),
        })
    }

    fn config_path() -> Option<PathBuf> {
        // A config file in the working directory wins; otherwise look under
        // XDG_CONFIG_HOME, falling back to ~/.config
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Some(local);
        }

        let config_dir = env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .ok()
            .or_else(|| dirs::home_dir().map(|h| h.join(".config")))?;

        Some(config_dir.join("promptfile").join(CONFIG_FILE_NAME))
    }

    fn load_file_config() -> FileConfig {
        Self::config_path()
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|content| toml::from_str(&content).ok())
            .unwrap_or_default()
    }
}

fn parse_max_tokens(value: &toml::Value) -> Result<u32, Error> {
    match value {
        toml::Value::Integer(n) => u32::try_from(*n)
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| Error::InvalidMaxTokens(n.to_string())),
        toml::Value::String(s) => s
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| Error::InvalidMaxTokens(s.clone())),
        other => Err(Error::InvalidMaxTokens(other.to_string())),
    }
}
