//! Server configuration from environment variables.
//!
//! `.env` is loaded by `main` before this runs, so every key can live there.
//! Empty values are treated as unset.

use crate::llm::engine::EngineSettings;
use crate::llm::model_manager::DEFAULT_MODELS_DIR;
use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:3000", "http://127.0.0.1:3000"];

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub model_path: Option<PathBuf>,
    pub models_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub engine: EngineSettings,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = EngineSettings::default();

        let n_ctx = parse_or(&get, "N_CTX", defaults.n_ctx)?;
        if n_ctx == 0 {
            return Err(ConfigError::Invalid {
                key: "N_CTX",
                value: n_ctx.to_string(),
            });
        }

        Ok(Self {
            model_path: get("MODEL_PATH").map(PathBuf::from),
            models_dir: get("MODELS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_DIR)),
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            engine: EngineSettings {
                n_ctx,
                n_threads: parse_or(&get, "N_THREADS", defaults.n_threads)?,
                n_gpu_layers: parse_or(&get, "N_GPU_LAYERS", defaults.n_gpu_layers)?,
            },
            cors_origins: match get("CORS_ORIGINS") {
                Some(list) => list
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                None => DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.model_path, None);
        assert_eq!(config.models_dir, PathBuf::from("models"));
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.engine, EngineSettings::default());
        assert_eq!(
            config.cors_origins,
            ["http://localhost:3000", "http://127.0.0.1:3000"]
        );
    }

    #[test]
    fn empty_model_path_counts_as_unset() {
        let config = config_from(&[("MODEL_PATH", "  ")]).unwrap();
        assert_eq!(config.model_path, None);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("MODEL_PATH", "models/phi-2.Q4_K_M.gguf"),
            ("PORT", "9001"),
            ("N_CTX", "4096"),
            ("N_GPU_LAYERS", "0"),
            ("CORS_ORIGINS", "http://a.test, ,http://b.test"),
        ])
        .unwrap();
        assert_eq!(
            config.model_path,
            Some(PathBuf::from("models/phi-2.Q4_K_M.gguf"))
        );
        assert_eq!(config.port, 9001);
        assert_eq!(config.engine.n_ctx, 4096);
        assert_eq!(config.engine.n_gpu_layers, 0);
        assert_eq!(config.engine.n_threads, 8);
        assert_eq!(config.cors_origins, ["http://a.test", "http://b.test"]);
    }

    #[test]
    fn bad_number_is_an_error() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(err.to_string(), r#"Invalid value for PORT: "eighty""#);
    }

    #[test]
    fn zero_context_window_is_rejected() {
        let err = config_from(&[("N_CTX", "0")]).unwrap_err();
        assert_eq!(err.to_string(), r#"Invalid value for N_CTX: "0""#);
    }
}
