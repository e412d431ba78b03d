//! Wire-format builders for decoder tests.

use crate::wire::encode_varint;

pub fn key(field: u64, wire_type: u8, out: &mut Vec<u8>) {
    encode_varint((field << 3) | u64::from(wire_type), out);
}

pub fn varint_field(field: u64, value: u64, out: &mut Vec<u8>) {
    key(field, 0, out);
    encode_varint(value, out);
}

pub fn fixed32_field(field: u64, value: f32, out: &mut Vec<u8>) {
    key(field, 5, out);
    out.extend(value.to_le_bytes());
}

pub fn fixed64_field(field: u64, value: f64, out: &mut Vec<u8>) {
    key(field, 1, out);
    out.extend(value.to_le_bytes());
}

pub fn bytes_field(field: u64, value: &[u8], out: &mut Vec<u8>) {
    key(field, 2, out);
    encode_varint(value.len() as u64, out);
    out.extend_from_slice(value);
}

pub fn string_field(field: u64, value: &str, out: &mut Vec<u8>) {
    bytes_field(field, value.as_bytes(), out);
}

pub fn message_field(field: u64, message: &[u8], out: &mut Vec<u8>) {
    bytes_field(field, message, out);
}

#[derive(Debug, Default)]
pub struct VehicleFields<'a> {
    pub trip_id: Option<&'a str>,
    pub route_id: Option<&'a str>,
    pub direction_id: Option<u32>,
    pub vehicle_id: Option<&'a str>,
    pub label: Option<&'a str>,
    pub latitude: Option<f32>,
    pub longitude: Option<f32>,
    pub bearing: Option<f32>,
    pub stop_id: Option<&'a str>,
    pub timestamp: Option<u64>,
    pub current_stop_sequence: Option<u64>,
}

pub fn vehicle_position_bytes(fields: &VehicleFields<'_>) -> Vec<u8> {
    let mut trip = Vec::new();
    if let Some(id) = fields.trip_id {
        string_field(1, id, &mut trip);
    }
    if let Some(route) = fields.route_id {
        string_field(5, route, &mut trip);
    }
    if let Some(dir) = fields.direction_id {
        varint_field(6, u64::from(dir), &mut trip);
    }

    let mut vehicle = Vec::new();
    if let Some(id) = fields.vehicle_id {
        string_field(1, id, &mut vehicle);
    }
    if let Some(label) = fields.label {
        string_field(2, label, &mut vehicle);
    }

    let mut position = Vec::new();
    if let Some(lat) = fields.latitude {
        fixed32_field(1, lat, &mut position);
    }
    if let Some(lon) = fields.longitude {
        fixed32_field(2, lon, &mut position);
    }
    if let Some(bearing) = fields.bearing {
        fixed32_field(3, bearing, &mut position);
    }

    let mut out = Vec::new();
    if !trip.is_empty() {
        message_field(1, &trip, &mut out);
    }
    if !position.is_empty() {
        message_field(2, &position, &mut out);
    }
    if let Some(seq) = fields.current_stop_sequence {
        varint_field(3, seq, &mut out);
    }
    if let Some(ts) = fields.timestamp {
        varint_field(5, ts, &mut out);
    }
    if let Some(stop) = fields.stop_id {
        string_field(7, stop, &mut out);
    }
    if !vehicle.is_empty() {
        message_field(8, &vehicle, &mut out);
    }
    out
}

pub fn entity_bytes(fields: &VehicleFields<'_>) -> Vec<u8> {
    let mut out = Vec::new();
    string_field(1, "entity", &mut out);
    message_field(4, &vehicle_position_bytes(fields), &mut out);
    out
}

pub fn feed_bytes(header_timestamp: Option<u64>, entities: &[Vec<u8>]) -> Vec<u8> {
    let mut header = Vec::new();
    string_field(1, "2.0", &mut header);
    if let Some(ts) = header_timestamp {
        varint_field(3, ts, &mut header);
    }

    let mut out = Vec::new();
    message_field(1, &header, &mut out);
    for entity in entities {
        message_field(2, entity, &mut out);
    }
    out
}
