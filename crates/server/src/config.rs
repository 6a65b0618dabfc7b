//! Server configuration

use anyhow::Result;
use pricer_lib::{NormalizerConfig, ServingOptions};
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// API server port for prediction/health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Directory holding the model artifacts
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Preprocessing artifact file name under the models directory
    #[serde(default = "default_preprocessor_file")]
    pub preprocessor_file: String,

    /// Upper bound on batch prediction size
    #[serde(default = "default_max_batch_rows")]
    pub max_batch_rows: usize,

    /// Degrade unexpected single-record output shapes to their first
    /// element instead of failing (legacy parity, logged when it fires)
    #[serde(default)]
    pub first_element_fallback: bool,
}

fn default_api_port() -> u16 {
    8080
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_preprocessor_file() -> String {
    "preprocessor.json".to_string()
}

fn default_max_batch_rows() -> usize {
    10_000
}

impl ServerConfig {
    /// Load configuration from the environment (`PRICER_` prefix).
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("PRICER"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| ServerConfig {
            api_port: default_api_port(),
            models_dir: default_models_dir(),
            preprocessor_file: default_preprocessor_file(),
            max_batch_rows: default_max_batch_rows(),
            first_element_fallback: false,
        }))
    }

    /// Translate into the pipeline's construction options.
    pub fn serving_options(&self) -> ServingOptions {
        ServingOptions {
            models_dir: self.models_dir.clone(),
            preprocessor_path: self.models_dir.join(&self.preprocessor_file),
            max_batch_rows: self.max_batch_rows,
            normalizer: NormalizerConfig {
                first_element_fallback: self.first_element_fallback,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::load().unwrap();
        assert_eq!(config.api_port, 8080);
        assert_eq!(config.models_dir, PathBuf::from("models"));
        assert_eq!(config.max_batch_rows, 10_000);
        assert!(!config.first_element_fallback);
    }

    #[test]
    fn test_serving_options_join_preprocessor_path() {
        let config = ServerConfig {
            api_port: 1,
            models_dir: PathBuf::from("/var/lib/pricer/models"),
            preprocessor_file: "preprocessor.json".to_string(),
            max_batch_rows: 100,
            first_element_fallback: false,
        };
        let options = config.serving_options();
        assert_eq!(
            options.preprocessor_path,
            PathBuf::from("/var/lib/pricer/models/preprocessor.json")
        );
    }
}
