//! Generic tag/value framing on top of [`ByteCursor`].
//!
//! Nothing here knows what a field means; message assemblers decide which
//! `(field_number, wire_type)` pairs to decode and hand everything else to
//! [`ByteCursor::skip`].

use super::{ByteCursor, DecodeError};

/// How a field's value is framed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint,
    Fixed64,
    LengthDelimited,
    StartGroup,
    EndGroup,
    Fixed32,
}

impl WireType {
    /// Maps the low three bits of a tag. Values 6 and 7 are not assigned by
    /// the protocol.
    pub fn from_raw(raw: u8) -> Result<Self, DecodeError> {
        match raw {
            0 => Ok(Self::Varint),
            1 => Ok(Self::Fixed64),
            2 => Ok(Self::LengthDelimited),
            3 => Ok(Self::StartGroup),
            4 => Ok(Self::EndGroup),
            5 => Ok(Self::Fixed32),
            other => Err(DecodeError::UnsupportedWireType(other)),
        }
    }

    pub fn as_raw(self) -> u8 {
        match self {
            Self::Varint => 0,
            Self::Fixed64 => 1,
            Self::LengthDelimited => 2,
            Self::StartGroup => 3,
            Self::EndGroup => 4,
            Self::Fixed32 => 5,
        }
    }
}

/// A decoded field key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub field_number: u64,
    pub wire_type: WireType,
}

impl Tag {
    pub fn split(key: u64) -> Result<Self, DecodeError> {
        Ok(Self {
            field_number: key >> 3,
            wire_type: WireType::from_raw((key & 0x07) as u8)?,
        })
    }
}

impl ByteCursor<'_> {
    /// Reads one field key and splits it into field number and wire type.
    pub fn read_tag(&mut self) -> Result<Tag, DecodeError> {
        let start = self.clone();
        let key = self.read_varint()?;

        Tag::split(key).inspect_err(|_| *self = start)
    }

    /// Consumes and discards one field value framed as `wire_type`.
    ///
    /// Groups cannot be sized without parsing them, so they are refused
    /// before any byte is consumed.
    pub fn skip(&mut self, wire_type: WireType) -> Result<(), DecodeError> {
        match wire_type {
            WireType::Varint => self.read_varint().map(drop),
            WireType::Fixed64 => self.read_fixed64().map(drop),
            WireType::LengthDelimited => self.read_length_delimited().map(drop),
            WireType::Fixed32 => self.read_fixed32().map(drop),
            WireType::StartGroup | WireType::EndGroup => {
                Err(DecodeError::UnsupportedWireType(wire_type.as_raw()))
            }
        }
    }
}
