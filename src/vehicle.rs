//! Flattened vehicle records handed to downstream sinks.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::gtfs_rt::VehiclePosition;

/// One vehicle, flattened from a decoded [`VehiclePosition`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleRecord {
    pub vehicle_id: Option<String>,
    pub vehicle_label: Option<String>,
    pub license_plate: Option<String>,
    pub trip_id: Option<String>,
    pub route_id: Option<String>,
    pub direction_id: Option<u32>,
    pub start_time: Option<String>,
    pub start_date: Option<String>,
    pub latitude: Option<f32>,
    pub longitude: Option<f32>,
    pub bearing: Option<f32>,
    pub speed: Option<f32>,
    pub current_stop_id: Option<String>,
    /// Entity timestamp, falling back to the feed header timestamp.
    pub position_timestamp: Option<DateTime<Utc>>,
    /// Wall-clock time at which the record was built.
    pub last_updated: DateTime<Utc>,
}

impl VehicleRecord {
    /// Builds a record from a decoded position, stamped with the current time.
    pub fn from_position(vp: VehiclePosition, header_timestamp: Option<u64>) -> Self {
        Self::from_position_at(vp, header_timestamp, Utc::now())
    }

    /// Same as [`from_position`](Self::from_position) with an explicit
    /// `last_updated`, so one batch can share a single timestamp.
    ///
    /// Records without coordinates are still produced; filtering belongs to
    /// [`validate`](crate::validate::validate).
    pub fn from_position_at(
        vp: VehiclePosition,
        header_timestamp: Option<u64>,
        now: DateTime<Utc>,
    ) -> Self {
        let VehiclePosition {
            trip,
            vehicle,
            position,
            stop_id,
            timestamp,
        } = vp;

        Self {
            vehicle_id: vehicle.id,
            vehicle_label: vehicle.label,
            license_plate: vehicle.license_plate,
            trip_id: trip.trip_id,
            route_id: trip.route_id,
            direction_id: trip.direction_id,
            start_time: trip.start_time,
            start_date: trip.start_date,
            latitude: position.latitude,
            longitude: position.longitude,
            bearing: position.bearing,
            speed: position.speed,
            current_stop_id: stop_id,
            position_timestamp: timestamp.or(header_timestamp).and_then(epoch_seconds),
            last_updated: now,
        }
    }
}

/// Converts POSIX seconds to a UTC instant; out-of-range values are absent.
fn epoch_seconds(secs: u64) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(secs).ok()?;
    DateTime::from_timestamp(secs, 0)
}
