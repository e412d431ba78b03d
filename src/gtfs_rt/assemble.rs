//! Message assemblers: one [`Message`] implementation per GTFS-RT message.
//!
//! Each assembler walks its slice tag by tag, decodes the fields it knows and
//! skips the rest. A field that appears more than once keeps its last value;
//! a repeated submessage is merged field by field into what came before.

use tracing::debug;

use super::{
    FeedEntity, FeedHeader, FeedMessage, Incrementality, Position, TripDescriptor,
    VehicleDescriptor, VehiclePosition,
};
use crate::wire::{ByteCursor, DecodeError, Tag, WireType};

use WireType::{Fixed32, LengthDelimited, Varint};

/// An entity that was dropped because its bytes could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityFault {
    /// Zero-based position of the entity field within the feed.
    pub index: usize,
    pub error: DecodeError,
}

/// A message that can be decoded from, and merged with, a wire slice.
pub trait Message: Default {
    /// Decodes the value of one field into `self`.
    ///
    /// Returns `Ok(false)` without consuming anything when the field is not
    /// one this message reads, leaving the caller to skip it.
    fn merge_field(&mut self, tag: Tag, cursor: &mut ByteCursor<'_>) -> Result<bool, DecodeError>;

    /// Merges every field in `buf` into `self`.
    fn merge(&mut self, buf: &[u8]) -> Result<(), DecodeError> {
        let mut cursor = ByteCursor::new(buf);

        while !cursor.at_end() {
            let tag = cursor.read_tag()?;
            if !self.merge_field(tag, &mut cursor)? {
                cursor.skip(tag.wire_type)?;
            }
        }

        Ok(())
    }

    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let mut message = Self::default();
        message.merge(buf)?;
        Ok(message)
    }
}

/// Reads a length-delimited UTF-8 string, replacing invalid sequences.
/// Empty strings come back as `None`.
fn read_string(cursor: &mut ByteCursor<'_>) -> Result<Option<String>, DecodeError> {
    let bytes = cursor.read_length_delimited()?;
    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(bytes).into_owned()))
}

/// Merges a length-delimited submessage into `target`.
fn merge_nested<M: Message>(
    target: &mut M,
    cursor: &mut ByteCursor<'_>,
) -> Result<(), DecodeError> {
    let bytes = cursor.read_length_delimited()?;
    target.merge(bytes)
}

impl Message for TripDescriptor {
    fn merge_field(&mut self, tag: Tag, cursor: &mut ByteCursor<'_>) -> Result<bool, DecodeError> {
        match (tag.field_number, tag.wire_type) {
            (1, LengthDelimited) => self.trip_id = read_string(cursor)?,
            (2, LengthDelimited) => self.start_time = read_string(cursor)?,
            (3, LengthDelimited) => self.start_date = read_string(cursor)?,
            (5, LengthDelimited) => self.route_id = read_string(cursor)?,
            // uint32 on the wire: upper bits of an oversized varint are dropped.
            (6, Varint) => self.direction_id = Some(cursor.read_varint()? as u32),
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Message for VehicleDescriptor {
    fn merge_field(&mut self, tag: Tag, cursor: &mut ByteCursor<'_>) -> Result<bool, DecodeError> {
        match (tag.field_number, tag.wire_type) {
            (1, LengthDelimited) => self.id = read_string(cursor)?,
            (2, LengthDelimited) => self.label = read_string(cursor)?,
            (3, LengthDelimited) => self.license_plate = read_string(cursor)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Message for Position {
    fn merge_field(&mut self, tag: Tag, cursor: &mut ByteCursor<'_>) -> Result<bool, DecodeError> {
        match (tag.field_number, tag.wire_type) {
            (1, Fixed32) => self.latitude = Some(cursor.read_fixed32()?),
            (2, Fixed32) => self.longitude = Some(cursor.read_fixed32()?),
            (3, Fixed32) => self.bearing = Some(cursor.read_fixed32()?),
            (5, Fixed32) => self.speed = Some(cursor.read_fixed32()?),
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Message for VehiclePosition {
    fn merge_field(&mut self, tag: Tag, cursor: &mut ByteCursor<'_>) -> Result<bool, DecodeError> {
        match (tag.field_number, tag.wire_type) {
            (1, LengthDelimited) => merge_nested(&mut self.trip, cursor)?,
            (2, LengthDelimited) => merge_nested(&mut self.position, cursor)?,
            // current_stop_sequence
            (3, wire_type) => cursor.skip(wire_type)?,
            (5, Varint) => self.timestamp = Some(cursor.read_varint()?),
            (7, LengthDelimited) => self.stop_id = read_string(cursor)?,
            (8, LengthDelimited) => merge_nested(&mut self.vehicle, cursor)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Message for FeedEntity {
    fn merge_field(&mut self, tag: Tag, cursor: &mut ByteCursor<'_>) -> Result<bool, DecodeError> {
        match (tag.field_number, tag.wire_type) {
            // Field 4 is `vehicle` in gtfs-realtime.proto. Some producers put it
            // on field 2, which is otherwise the varint `is_deleted` flag.
            (2 | 4, LengthDelimited) => {
                merge_nested(self.vehicle.get_or_insert_with(Default::default), cursor)?
            }
            // id, trip_update, alert
            (1 | 3 | 5, wire_type) => cursor.skip(wire_type)?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl Message for FeedHeader {
    fn merge_field(&mut self, tag: Tag, cursor: &mut ByteCursor<'_>) -> Result<bool, DecodeError> {
        match (tag.field_number, tag.wire_type) {
            (1, LengthDelimited) => self.gtfs_realtime_version = read_string(cursor)?,
            (2, Varint) => {
                self.incrementality = match cursor.read_varint()? {
                    0 => Some(Incrementality::FullDataset),
                    1 => Some(Incrementality::Differential),
                    _ => None,
                }
            }
            (3, Varint) => self.timestamp = Some(cursor.read_varint()?),
            _ => return Ok(false),
        }
        Ok(true)
    }
}

impl FeedMessage {
    /// Decodes a whole feed, containing failures at the entity boundary.
    ///
    /// An entity whose contents fail to decode is dropped and recorded as an
    /// [`EntityFault`]; decoding carries on with the next entity. A failure in
    /// the feed's own framing (an unreadable tag, or an entity whose length
    /// runs past the buffer) ends decoding and is kept in `framing_error`.
    pub fn decode(buf: &[u8]) -> FeedMessage {
        let mut feed = FeedMessage::default();
        let mut cursor = ByteCursor::new(buf);

        if let Err(error) = feed.decode_fields(&mut cursor) {
            debug!(
                %error,
                offset = cursor.position(),
                entities = feed.entity.len(),
                "Feed framing broken, keeping entities decoded so far"
            );
            feed.framing_error = Some(error);
        }

        feed
    }

    fn decode_fields(&mut self, cursor: &mut ByteCursor<'_>) -> Result<(), DecodeError> {
        while !cursor.at_end() {
            let tag = cursor.read_tag()?;

            match (tag.field_number, tag.wire_type) {
                (1, LengthDelimited) => {
                    let bytes = cursor.read_length_delimited()?;
                    if let Err(error) = self.header.merge(bytes) {
                        debug!(%error, "Feed header failed to decode, ignoring it");
                        self.header = FeedHeader::default();
                        self.header_error = Some(error);
                    }
                }
                (2, LengthDelimited) => {
                    let index = self.entities_seen();
                    let bytes = cursor.read_length_delimited()?;
                    match FeedEntity::decode(bytes) {
                        Ok(entity) => self.entity.push(entity),
                        Err(error) => {
                            debug!(index, %error, "Dropping undecodable feed entity");
                            self.faults.push(EntityFault { index, error });
                        }
                    }
                }
                _ => cursor.skip(tag.wire_type)?,
            }
        }

        Ok(())
    }
}
