use std::env;

use stitch_openai_model::{OpenAIConfig, OpenAIConfigBuilder};

use crate::store::MemorySessionStore;

/// Error returned by [`Config::from_env`].
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
    /// A variable is set to a value that can't be used.
    #[error("invalid value for {var}: {value:?}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Host configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    openai: OpenAIConfig,
    max_sessions: Option<usize>,
}

impl Config {
    /// Reads the configuration from environment variables.
    ///
    /// `OPENAI_API_KEY` is required. `OPENAI_BASE_URL`, `OPENAI_MODEL`,
    /// `OPENAI_TEMPERATURE` and `STITCH_MAX_SESSIONS` are optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.is_empty());

        let api_key = var("OPENAI_API_KEY")
            .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        let mut builder = OpenAIConfigBuilder::with_api_key(api_key);
        if let Some(base_url) = var("OPENAI_BASE_URL") {
            builder = builder.with_base_url(base_url);
        }
        if let Some(model) = var("OPENAI_MODEL") {
            builder = builder.with_model(model);
        }
        if let Some(value) = var("OPENAI_TEMPERATURE") {
            let temperature = value.trim().parse::<f32>().ok();
            let Some(temperature) = temperature.filter(|t| t.is_finite())
            else {
                return Err(ConfigError::Invalid {
                    var: "OPENAI_TEMPERATURE",
                    value,
                });
            };
            builder = builder.with_temperature(temperature);
        }

        let max_sessions = match var("STITCH_MAX_SESSIONS") {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(max) if max > 0 => Some(max),
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "STITCH_MAX_SESSIONS",
                        value,
                    });
                }
            },
            None => None,
        };

        Ok(Self {
            openai: builder.build(),
            max_sessions,
        })
    }

    /// Provider configuration.
    #[inline]
    pub fn openai(&self) -> &OpenAIConfig {
        &self.openai
    }

    /// Maximum number of sessions kept in memory, if bounded.
    #[inline]
    pub fn max_sessions(&self) -> Option<usize> {
        self.max_sessions
    }

    /// Creates the session store this configuration describes.
    pub fn session_store(&self) -> MemorySessionStore {
        match self.max_sessions {
            Some(max) => MemorySessionStore::with_max_sessions(max),
            None => MemorySessionStore::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup<'a>(
        vars: &'a [(&'a str, &'a str)],
    ) -> impl Fn(&str) -> Option<String> + 'a {
        let vars: HashMap<_, _> = vars.iter().copied().collect();
        move |name| vars.get(name).map(|value| value.to_string())
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-1")]))
            .unwrap();
        assert_eq!(config.openai().model(), "gpt-4o");
        assert_eq!(config.openai().base_url(), "https://api.openai.com/v1");
        assert_eq!(config.max_sessions(), None);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-1"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
            ("OPENAI_MODEL", "llama3"),
            ("OPENAI_TEMPERATURE", "0.2"),
            ("STITCH_MAX_SESSIONS", "16"),
        ]))
        .unwrap();
        assert_eq!(config.openai().model(), "llama3");
        assert_eq!(config.openai().base_url(), "http://localhost:8080/v1");
        assert_eq!(config.max_sessions(), Some(16));
    }

    #[test]
    fn test_missing_api_key() {
        let err = Config::from_lookup(lookup(&[("OPENAI_API_KEY", "")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing("OPENAI_API_KEY"));
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-1"),
            ("OPENAI_TEMPERATURE", "warm"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "OPENAI_TEMPERATURE",
                value: "warm".to_owned(),
            }
        );

        let err = Config::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-1"),
            ("STITCH_MAX_SESSIONS", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("STITCH_MAX_SESSIONS"));
    }
}
