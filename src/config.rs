use std::fs;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::DatasetLabel;
use crate::error::FetchError;

pub const DEFAULT_CONFIG_FILE: &str = "slide-fetch.json";
pub const DEFAULT_DATASET: &str = "blca";
pub const DEFAULT_SPLITS_DIR: &str = "splits";
pub const DEFAULT_BASE_URL: &str = "https://api.gdc.cancer.gov";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub dataset: Option<String>,
    #[serde(default)]
    pub splits_dir: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub dataset: Option<String>,
    pub splits_dir: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub dataset: DatasetLabel,
    pub splits_dir: Utf8PathBuf,
    pub base_url: String,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolution order per field: CLI flag, then config file, then the
    /// built-in default. An explicitly passed config path must exist; the
    /// default `slide-fetch.json` is optional.
    pub fn resolve(
        path: Option<&str>,
        overrides: CliOverrides,
    ) -> Result<ResolvedConfig, FetchError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if config_path.as_std_path().exists() {
            let content = fs::read_to_string(config_path.as_std_path())
                .map_err(|_| FetchError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| FetchError::ConfigParse(err.to_string()))?
        } else if path.is_some() {
            return Err(FetchError::ConfigRead(config_path));
        } else {
            Config::default()
        };

        Self::resolve_config(config, overrides)
    }

    pub fn resolve_config(
        config: Config,
        overrides: CliOverrides,
    ) -> Result<ResolvedConfig, FetchError> {
        let dataset = overrides
            .dataset
            .or(config.dataset)
            .unwrap_or_else(|| DEFAULT_DATASET.to_string())
            .parse()?;
        let splits_dir = overrides
            .splits_dir
            .or(config.splits_dir)
            .unwrap_or_else(|| DEFAULT_SPLITS_DIR.to_string());
        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(ResolvedConfig {
            dataset,
            splits_dir: Utf8PathBuf::from(splits_dir),
            base_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_defaults() {
        let resolved =
            ConfigLoader::resolve_config(Config::default(), CliOverrides::default()).unwrap();
        assert_eq!(resolved.dataset.as_str(), DEFAULT_DATASET);
        assert_eq!(resolved.splits_dir.as_str(), DEFAULT_SPLITS_DIR);
        assert_eq!(resolved.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn cli_overrides_config_file() {
        let config = Config {
            dataset: Some("brca".to_string()),
            splits_dir: Some("splits/brca".to_string()),
            base_url: None,
        };
        let overrides = CliOverrides {
            dataset: Some("luad".to_string()),
            splits_dir: None,
        };

        let resolved = ConfigLoader::resolve_config(config, overrides).unwrap();
        assert_eq!(resolved.dataset.as_str(), "luad");
        assert_eq!(resolved.splits_dir.as_str(), "splits/brca");
    }
}
