use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::gtfs_rt::FeedMessage;
use crate::validate::{Classifier, Rejections, VehicleType};
use crate::vehicle::VehicleRecord;

/// One row of per-cycle counters.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CycleStats {
    pub timestamp: DateTime<Utc>,
    pub fetch_attempts: u32,
    pub bytes: usize,

    // decoding
    pub entities: usize,
    pub decode_failures: usize,
    pub framing_error: Option<String>,
    pub header_error: Option<String>,
    pub vehicles: usize,

    // validation
    pub valid: usize,
    pub rejected_missing: usize,
    pub rejected_zero: usize,
    pub rejected_out_of_bounds: usize,

    // classification of valid records
    pub trams: usize,
    pub trains: usize,
    pub buses: usize,
    pub unknown: usize,

    // error tracking
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

impl CycleStats {
    pub fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            ..Default::default()
        }
    }

    /// Record decoding counters from a parsed feed.
    pub fn with_feed(mut self, feed: &FeedMessage) -> Self {
        self.entities = feed.entities_seen();
        self.decode_failures = feed.faults.len();
        self.framing_error = feed.framing_error.map(|e| e.to_string());
        self.header_error = feed.header_error.map(|e| e.to_string());
        self.vehicles = feed.vehicles().count();
        self
    }

    pub fn with_validation(
        mut self,
        valid: &[VehicleRecord],
        rejections: &Rejections,
        classifier: &Classifier,
    ) -> Self {
        self.valid = valid.len();
        self.rejected_missing = rejections.missing_coordinates;
        self.rejected_zero = rejections.zero_coordinates;
        self.rejected_out_of_bounds = rejections.out_of_bounds;

        for record in valid {
            match classifier.classify(record.route_id.as_deref()) {
                VehicleType::Tram => self.trams += 1,
                VehicleType::Train => self.trains += 1,
                VehicleType::Bus => self.buses += 1,
                VehicleType::Unknown => self.unknown += 1,
            }
        }
        self
    }

    /// Create an error record with timestamp and error information
    pub fn from_error(error_type: &str, error_message: &str) -> Self {
        CycleStats {
            timestamp: Utc::now(),
            error_type: Some(error_type.to_string()),
            error_message: Some(error_message.to_string()),
            ..Default::default()
        }
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    /// Share of decoded vehicles that survived validation.
    pub fn valid_pct(&self) -> f64 {
        Self::pct(self.valid, self.vehicles)
    }
}
