//! Protobuf parser for GTFS Realtime vehicle-position feeds.

use chrono::Utc;

use crate::gtfs_rt::FeedMessage;
use crate::vehicle::VehicleRecord;

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// Never fails outright: entities that cannot be decoded are dropped and
/// listed in [`FeedMessage::faults`].
pub fn parse_feed(bytes: &[u8]) -> FeedMessage {
    FeedMessage::decode(bytes)
}

/// Flattens every vehicle position in `feed`, in feed order.
///
/// Entities without a vehicle contribute nothing. All records share one
/// `last_updated` instant.
pub fn normalize(feed: FeedMessage) -> Vec<VehicleRecord> {
    let now = Utc::now();
    let header_timestamp = feed.header.timestamp;

    feed.entity
        .into_iter()
        .filter_map(|e| e.vehicle)
        .map(|vp| VehicleRecord::from_position_at(vp, header_timestamp, now))
        .collect()
}

/// [`parse_feed`] followed by [`normalize`].
pub fn parse_vehicles(bytes: &[u8]) -> Vec<VehicleRecord> {
    normalize(parse_feed(bytes))
}
