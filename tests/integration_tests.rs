use async_trait::async_trait;
use gtfs_rt_vehicles::config::PipelineConfig;
use gtfs_rt_vehicles::output::{CsvSink, VehicleSink, append_record};
use gtfs_rt_vehicles::parser::{parse_feed, parse_vehicles};
use gtfs_rt_vehicles::pipeline::Pipeline;
use gtfs_rt_vehicles::validate::{Classifier, VehicleType};
use gtfs_rt_vehicles::vehicle::VehicleRecord;
use gtfs_rt_vehicles::wire::DecodeError;

fn varint(mut v: u64, out: &mut Vec<u8>) {
    while v >= 0x80 {
        out.push((v as u8) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

fn field(number: u64, payload: &[u8], out: &mut Vec<u8>) {
    varint(number << 3 | 2, out);
    varint(payload.len() as u64, out);
    out.extend_from_slice(payload);
}

fn float(number: u64, v: f32, out: &mut Vec<u8>) {
    varint(number << 3 | 5, out);
    out.extend_from_slice(&v.to_le_bytes());
}

/// An entity carrying a vehicle with an id, a route and a position.
fn vehicle_entity(id: &str, route: &str, lat: f32, lon: f32) -> Vec<u8> {
    let mut trip = Vec::new();
    field(5, route.as_bytes(), &mut trip);

    let mut descriptor = Vec::new();
    field(1, id.as_bytes(), &mut descriptor);

    let mut position = Vec::new();
    float(1, lat, &mut position);
    float(2, lon, &mut position);

    let mut vp = Vec::new();
    field(1, &trip, &mut vp);
    field(2, &position, &mut vp);
    field(8, &descriptor, &mut vp);

    let mut entity = Vec::new();
    field(1, format!("e-{id}").as_bytes(), &mut entity);
    field(4, &vp, &mut entity);
    entity
}

fn feed(entities: &[Vec<u8>]) -> Vec<u8> {
    let mut header = Vec::new();
    field(1, b"2.0", &mut header);
    varint(3 << 3, &mut header);
    varint(1_700_000_000, &mut header);

    let mut out = Vec::new();
    field(1, &header, &mut out);
    for e in entities {
        field(2, e, &mut out);
    }
    out
}

struct Collect(Vec<VehicleRecord>);

#[async_trait]
impl VehicleSink for Collect {
    async fn publish(&mut self, records: &[VehicleRecord]) -> anyhow::Result<usize> {
        self.0.extend_from_slice(records);
        Ok(records.len())
    }
}

#[test]
fn test_corrupt_entity_is_contained() {
    // Vehicle field claims ten bytes but only one follows.
    let mut corrupt = Vec::new();
    varint(4 << 3 | 2, &mut corrupt);
    corrupt.extend_from_slice(&[10, 0x08]);

    let bytes = feed(&[
        vehicle_entity("A", "GLNELG", -34.92, 138.6),
        corrupt,
        vehicle_entity("B", "H30", -34.93, 138.59),
    ]);

    let feed = parse_feed(&bytes);
    assert_eq!(feed.header.timestamp, Some(1_700_000_000));
    assert_eq!(feed.entities_seen(), 3);
    assert_eq!(feed.faults.len(), 1);
    assert_eq!(feed.faults[0].index, 1);
    assert_eq!(feed.faults[0].error, DecodeError::Truncated);

    let ids: Vec<_> = parse_vehicles(&bytes)
        .into_iter()
        .filter_map(|r| r.vehicle_id)
        .collect();
    assert_eq!(ids, ["A", "B"]);
}

#[test]
fn test_zero_entity_feed() {
    let records = parse_vehicles(&feed(&[]));
    assert!(records.is_empty());
}

#[test]
fn test_truncated_feed_keeps_earlier_entities() {
    let mut bytes = feed(&[vehicle_entity("A", "743", -34.9, 138.6)]);
    // Start another entity whose length runs past the end.
    varint(2 << 3 | 2, &mut bytes);
    bytes.push(50);

    let feed = parse_feed(&bytes);
    assert_eq!(feed.framing_error, Some(DecodeError::Truncated));
    assert_eq!(feed.vehicles().count(), 1);
}

#[test]
fn test_classification_of_decoded_routes() {
    let bytes = feed(&[
        vehicle_entity("1", "GLNELG", -34.9, 138.6),
        vehicle_entity("2", "BEL", -34.9, 138.6),
        vehicle_entity("3", "200", -34.9, 138.6),
    ]);

    let classifier = Classifier::default();
    let types: Vec<_> = parse_vehicles(&bytes)
        .iter()
        .map(|r| classifier.classify(r.route_id.as_deref()))
        .collect();
    assert_eq!(types, [VehicleType::Tram, VehicleType::Train, VehicleType::Bus]);
}

#[tokio::test]
async fn test_process_filters_by_bounding_box() {
    let bytes = feed(&[
        vehicle_entity("in", "743", -34.92, 138.6),
        vehicle_entity("zero", "743", 0.0, 0.0),
        vehicle_entity("melbourne", "743", -37.81, 144.96),
    ]);

    let pipeline = Pipeline::from_config(PipelineConfig::default()).unwrap();
    let mut sink = Collect(Vec::new());
    let stats = pipeline.process(&bytes, &mut sink).await;

    assert_eq!(sink.0.len(), 1);
    assert_eq!(sink.0[0].vehicle_id.as_deref(), Some("in"));
    assert_eq!(stats.rejected_zero, 1);
    assert_eq!(stats.rejected_out_of_bounds, 1);
}

#[tokio::test]
async fn test_process_into_csv_sink() {
    let dir = tempfile::tempdir().unwrap();
    let vehicles = dir.path().join("vehicles.csv");
    let cycles = dir.path().join("cycles.csv");

    let pipeline = Pipeline::from_config(PipelineConfig::default()).unwrap();
    let mut sink = CsvSink::new(&vehicles, pipeline.classifier().clone());

    let bytes = feed(&[
        vehicle_entity("10", "BTANIC", -34.91, 138.61),
        vehicle_entity("11", "GAW", -34.6, 138.7),
    ]);
    let stats = pipeline.process(&bytes, &mut sink).await;
    append_record(cycles.to_str().unwrap(), &stats).unwrap();

    let content = std::fs::read_to_string(&vehicles).unwrap();
    let rows: Vec<_> = content.lines().skip(1).collect();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].starts_with("10,") && rows[0].ends_with(",Tram"));
    assert!(rows[1].starts_with("11,") && rows[1].ends_with(",Train"));

    let cycles = std::fs::read_to_string(&cycles).unwrap();
    assert_eq!(cycles.lines().count(), 2);
}
