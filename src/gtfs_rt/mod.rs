//! The subset of the GTFS Realtime schema needed to extract vehicle positions.
//!
//! Every field is optional: an absent field is `None`, never a zero value. A
//! zero-length string on the wire is treated as absent.

mod assemble;

#[cfg(test)]
pub(crate) mod testing;

pub use assemble::{EntityFault, Message};

use crate::wire::DecodeError;

/// Identifies the trip a vehicle is serving.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TripDescriptor {
    pub trip_id: Option<String>,
    pub route_id: Option<String>,
    pub direction_id: Option<u32>,
    pub start_time: Option<String>,
    pub start_date: Option<String>,
}

/// Identifies the physical vehicle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VehicleDescriptor {
    pub id: Option<String>,
    pub label: Option<String>,
    pub license_plate: Option<String>,
}

/// WGS-84 position, bearing in degrees clockwise from north, speed in m/s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Position {
    pub latitude: Option<f32>,
    pub longitude: Option<f32>,
    pub bearing: Option<f32>,
    pub speed: Option<f32>,
}

/// Realtime positioning information for one vehicle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehiclePosition {
    pub trip: TripDescriptor,
    pub vehicle: VehicleDescriptor,
    pub position: Position,
    pub stop_id: Option<String>,
    /// Seconds since the Unix epoch at which the position was measured.
    pub timestamp: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Incrementality {
    FullDataset,
    Differential,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedHeader {
    pub gtfs_realtime_version: Option<String>,
    pub incrementality: Option<Incrementality>,
    /// Seconds since the Unix epoch at which the feed was produced.
    pub timestamp: Option<u64>,
}

/// One entity of the feed. Only vehicle positions are decoded; trip updates
/// and alerts are skipped unread.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedEntity {
    pub vehicle: Option<VehiclePosition>,
}

/// A decoded feed.
///
/// Decoding a feed never fails as a whole. Entities that fail to decode are
/// recorded in `faults` and left out of `entity`; a header that fails to
/// decode is left at its default and reported in `header_error`. If the outer
/// framing itself breaks, decoding stops there and `framing_error` is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedMessage {
    pub header: FeedHeader,
    pub header_error: Option<DecodeError>,
    pub entity: Vec<FeedEntity>,
    pub faults: Vec<EntityFault>,
    pub framing_error: Option<DecodeError>,
}

impl FeedMessage {
    /// Number of entity fields seen on the wire, decoded or not.
    pub fn entities_seen(&self) -> usize {
        self.entity.len() + self.faults.len()
    }

    pub fn vehicles(&self) -> impl Iterator<Item = &VehiclePosition> {
        self.entity.iter().filter_map(|e| e.vehicle.as_ref())
    }
}
