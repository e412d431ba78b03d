//! Geographic validation and a coarse vehicle-type heuristic.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::vehicle::VehicleRecord;

/// An inclusive latitude/longitude box in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Default for BoundingBox {
    /// Greater Adelaide.
    fn default() -> Self {
        Self {
            min_lat: -36.5,
            max_lat: -33.5,
            min_lon: 137.5,
            max_lon: 140.5,
        }
    }
}

impl BoundingBox {
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

/// Why records were dropped by [`validate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rejections {
    pub missing_coordinates: usize,
    pub zero_coordinates: usize,
    pub out_of_bounds: usize,
}

impl Rejections {
    pub fn total(&self) -> usize {
        self.missing_coordinates + self.zero_coordinates + self.out_of_bounds
    }
}

/// Keeps records whose coordinates are present, non-zero and inside `bbox`.
pub fn validate(records: Vec<VehicleRecord>, bbox: &BoundingBox) -> (Vec<VehicleRecord>, Rejections) {
    let mut rejections = Rejections::default();

    let valid: Vec<_> = records
        .into_iter()
        .filter(|r| {
            let (Some(lat), Some(lon)) = (r.latitude, r.longitude) else {
                rejections.missing_coordinates += 1;
                return false;
            };
            if lat == 0.0 || lon == 0.0 {
                rejections.zero_coordinates += 1;
                return false;
            }
            if !bbox.contains(f64::from(lat), f64::from(lon)) {
                rejections.out_of_bounds += 1;
                return false;
            }
            true
        })
        .collect();

    (valid, rejections)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VehicleType {
    Unknown,
    Tram,
    Train,
    Bus,
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VehicleType::Unknown => "Unknown",
            VehicleType::Tram => "Tram",
            VehicleType::Train => "Train",
            VehicleType::Bus => "Bus",
        };
        f.write_str(s)
    }
}

/// Best-effort guess of the mode from the route id alone.
///
/// This does not consult route metadata. Tram routes come from a fixed
/// allow-list, purely alphabetic ids are assumed to be train lines, and
/// everything else is a bus.
#[derive(Debug, Clone)]
pub struct Classifier {
    tram_routes: HashSet<String>,
}

impl Classifier {
    pub fn new<I, S>(tram_routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tram_routes: tram_routes
                .into_iter()
                .map(|r| r.as_ref().trim().to_uppercase())
                .collect(),
        }
    }

    pub fn classify(&self, route_id: Option<&str>) -> VehicleType {
        let route = match route_id.map(str::trim) {
            Some(r) if !r.is_empty() => r.to_uppercase(),
            _ => return VehicleType::Unknown,
        };

        if self.tram_routes.contains(&route) {
            VehicleType::Tram
        } else if route.chars().all(char::is_alphabetic) {
            VehicleType::Train
        } else {
            VehicleType::Bus
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_TRAM_ROUTES)
    }
}

/// Adelaide's tram routes.
pub const DEFAULT_TRAM_ROUTES: [&str; 2] = ["GLNELG", "BTANIC"];

/// Classifies with the default tram allow-list.
pub fn classify(route_id: Option<&str>) -> VehicleType {
    Classifier::default().classify(route_id)
}
