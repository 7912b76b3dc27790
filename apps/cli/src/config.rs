//! YAML configuration for the CLI.

use anyhow::{bail, Context, Result};
use price_oracle::{Listing, OracleConfig};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use projection::EngineConfig;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub request_timeout_secs: u64,
    pub oracle: OracleSection,
}

/// Oracle poll/cache settings plus the category -> listings table served by
/// the in-process price service.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    #[serde(flatten)]
    pub settings: OracleConfig,
    pub listings: BTreeMap<String, Vec<Listing>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: persistence::default_sqlite_url().to_string(),
            request_timeout_secs: 90,
            oracle: OracleSection::default(),
        }
    }
}

impl AppConfig {
    /// Parse a YAML document; absent fields take their defaults.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Self = serde_yaml::from_str(text).context("invalid configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// The oracle must give up polling before the request deadline, or a
    /// slow price lookup would abort the whole report.
    pub fn validate(&self) -> Result<()> {
        let polling = self.oracle.settings.poll_budget();
        if polling >= self.request_timeout() {
            bail!(
                "oracle polling ({}ms x {}) must finish within request_timeout_secs ({})",
                self.oracle.settings.poll_interval_ms,
                self.oracle.settings.max_polls,
                self.request_timeout_secs
            );
        }
        Ok(())
    }

    /// Load `path`, or the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The price lookup may poll its full budget plus one interval for the
    /// final request; the engine caps it below the request timeout.
    pub fn engine_config(&self) -> EngineConfig {
        let settings = &self.oracle.settings;
        EngineConfig {
            request_timeout: self.request_timeout(),
            price_timeout: settings.poll_budget() + settings.poll_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = AppConfig::from_yaml("").unwrap();
        assert_eq!(cfg.database_url, "sqlite://./data/history.db");
        assert_eq!(cfg.request_timeout(), Duration::from_secs(90));
        cfg.validate().unwrap();
        assert_eq!(cfg.oracle.settings, OracleConfig::default());
        assert!(cfg.oracle.listings.is_empty());
    }

    #[test]
    fn oracle_block_is_flat() {
        let cfg = AppConfig::from_yaml(
            r#"
database_url: "sqlite::memory:"
oracle:
  max_polls: 5
  poll_interval_ms: 10
  listings:
    Toothpaste:
      - { min_price: 4.0, max_price: 6.0 }
      - { min_price: 8.0, max_price: 12.0 }
"#,
        )
        .unwrap();
        assert_eq!(cfg.database_url, "sqlite::memory:");
        assert_eq!(cfg.request_timeout_secs, 90);
        assert_eq!(cfg.oracle.settings.max_polls, 5);
        assert_eq!(cfg.oracle.settings.poll_interval_ms, 10);
        assert_eq!(cfg.oracle.settings.cache_capacity, 200);
        assert_eq!(cfg.oracle.listings["Toothpaste"].len(), 2);
    }

    #[test]
    fn sample_files_parse() {
        let cfg = AppConfig::from_yaml(include_str!("../../../demos/launch.yaml")).unwrap();
        assert_eq!(cfg.oracle.settings.poll_interval_ms, 250);
        assert_eq!(cfg.oracle.listings["Toothpaste"].len(), 2);
        let params = projection::decode_request(include_str!("../../../demos/request.json")).unwrap();
        assert_eq!(params.enabled_retailers(), ["Walmart", "Costco"]);
        launch_core::validate_parameters(&params).unwrap();
    }

    #[test]
    fn polling_must_fit_the_request_timeout() {
        let err = AppConfig::from_yaml(
            r#"
request_timeout_secs: 30
oracle:
  poll_interval_ms: 1000
  max_polls: 60
"#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("request_timeout_secs (30)"));

        let cfg = AppConfig::from_yaml("request_timeout_secs: 61\n").unwrap();
        let engine = cfg.engine_config();
        assert_eq!(engine.request_timeout, Duration::from_secs(61));
        assert_eq!(engine.price_timeout, Duration::from_secs(61));
        assert!(engine.price_budget() < engine.request_timeout);
    }

    #[test]
    fn missing_file_means_defaults() {
        let cfg = AppConfig::load(Path::new("/nonexistent/launch.yaml")).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }
}
