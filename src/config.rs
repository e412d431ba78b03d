//! Pipeline configuration.
//!
//! Stored as a JSON object on disk; every key is optional and falls back to
//! the Adelaide Metro defaults:
//! ```json
//! {
//!   "feed_url": "https://gtfs.adelaidemetro.com.au/v1/realtime/vehicle_positions",
//!   "bounding_box": { "min_lat": -36.5, "max_lat": -33.5, "min_lon": 137.5, "max_lon": 140.5 },
//!   "max_retries": 4,
//!   "base_delay_ms": 1500,
//!   "timeout_secs": 30,
//!   "tram_routes": ["GLNELG", "BTANIC"]
//! }
//! ```

use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::fetch::RetryPolicy;
use crate::validate::{BoundingBox, Classifier, DEFAULT_TRAM_ROUTES};

pub const DEFAULT_FEED_URL: &str = "https://gtfs.adelaidemetro.com.au/v1/realtime/vehicle_positions";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub feed_url: String,
    pub bounding_box: BoundingBox,
    /// Total fetch attempts per cycle.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub tram_routes: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            bounding_box: BoundingBox::default(),
            max_retries: 4,
            base_delay_ms: 1500,
            timeout_secs: 30,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            tram_routes: DEFAULT_TRAM_ROUTES.iter().map(|r| r.to_string()).collect(),
        }
    }
}

impl PipelineConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config '{path}'"))?;
        let config: PipelineConfig =
            serde_json::from_str(&content).with_context(|| format!("parsing config '{path}'"))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(!self.feed_url.trim().is_empty(), "feed_url must not be empty");
        ensure!(self.max_retries > 0, "max_retries must be at least 1");
        ensure!(self.timeout_secs > 0, "timeout_secs must be at least 1");

        let b = &self.bounding_box;
        ensure!(
            b.min_lat <= b.max_lat && b.min_lon <= b.max_lon,
            "bounding box is inverted: {b:?}"
        );
        ensure!(
            (-90.0..=90.0).contains(&b.min_lat) && (-90.0..=90.0).contains(&b.max_lat),
            "bounding box latitude out of range: {b:?}"
        );
        ensure!(
            (-180.0..=180.0).contains(&b.min_lon) && (-180.0..=180.0).contains(&b.max_lon),
            "bounding box longitude out of range: {b:?}"
        );
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.base_delay_ms),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(&self.tram_routes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::VehicleType;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(config.user_agent.starts_with("gtfs_rt_vehicles/"));
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "feed_url": "https://example.com/vp.pb", "max_retries": 2, "tram_routes": ["CITY"] }}"#
        )
        .unwrap();

        let config = PipelineConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.feed_url, "https://example.com/vp.pb");
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.base_delay_ms, 1500);
        assert_eq!(config.bounding_box, BoundingBox::default());
        assert_eq!(config.classifier().classify(Some("city")), VehicleType::Tram);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(PipelineConfig::load("/nonexistent/gtfs_rt_vehicles.json").is_err());
    }

    #[test]
    fn test_inverted_bbox_rejected() {
        let config = PipelineConfig {
            bounding_box: BoundingBox {
                min_lat: -33.5,
                max_lat: -36.5,
                min_lon: 137.5,
                max_lon: 140.5,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_retries_rejected() {
        let config = PipelineConfig {
            max_retries: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
