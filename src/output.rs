//! Downstream sinks for validated vehicle records, plus CSV persistence of
//! per-cycle statistics.
//!
//! A sink owns its own schema mapping; the pipeline only hands it an ordered
//! slice of [`VehicleRecord`]s.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::stats::CycleStats;
use crate::validate::{Classifier, VehicleType};
use crate::vehicle::VehicleRecord;

/// Consumer of one cycle's validated records.
#[async_trait]
pub trait VehicleSink: Send {
    /// Publishes `records`, returning how many were written.
    async fn publish(&mut self, records: &[VehicleRecord]) -> Result<usize>;
}

/// Flat CSV row, one per vehicle.
#[derive(Serialize)]
struct VehicleRow<'a> {
    vehicle_id: Option<&'a str>,
    vehicle_label: Option<&'a str>,
    license_plate: Option<&'a str>,
    trip_id: Option<&'a str>,
    route_id: Option<&'a str>,
    direction_id: Option<u32>,
    start_time: Option<&'a str>,
    start_date: Option<&'a str>,
    latitude: Option<f32>,
    longitude: Option<f32>,
    bearing: Option<f32>,
    speed: Option<f32>,
    current_stop_id: Option<&'a str>,
    position_timestamp: Option<DateTime<Utc>>,
    last_updated: DateTime<Utc>,
    vehicle_type: VehicleType,
}

impl<'a> VehicleRow<'a> {
    fn new(r: &'a VehicleRecord, classifier: &Classifier) -> Self {
        Self {
            vehicle_id: r.vehicle_id.as_deref(),
            vehicle_label: r.vehicle_label.as_deref(),
            license_plate: r.license_plate.as_deref(),
            trip_id: r.trip_id.as_deref(),
            route_id: r.route_id.as_deref(),
            direction_id: r.direction_id,
            start_time: r.start_time.as_deref(),
            start_date: r.start_date.as_deref(),
            latitude: r.latitude,
            longitude: r.longitude,
            bearing: r.bearing,
            speed: r.speed,
            current_stop_id: r.current_stop_id.as_deref(),
            position_timestamp: r.position_timestamp,
            last_updated: r.last_updated,
            vehicle_type: classifier.classify(r.route_id.as_deref()),
        }
    }
}

/// Stages each cycle's vehicles in a CSV file, replacing the previous
/// cycle's contents.
pub struct CsvSink {
    path: PathBuf,
    classifier: Classifier,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>, classifier: Classifier) -> Self {
        Self {
            path: path.into(),
            classifier,
        }
    }
}

#[async_trait]
impl VehicleSink for CsvSink {
    async fn publish(&mut self, records: &[VehicleRecord]) -> Result<usize> {
        let mut writer = WriterBuilder::new()
            .from_path(&self.path)
            .with_context(|| format!("opening '{}'", self.path.display()))?;

        for record in records {
            writer.serialize(VehicleRow::new(record, &self.classifier))?;
        }
        writer.flush()?;

        debug!(path = %self.path.display(), rows = records.len(), "Vehicle CSV written");
        Ok(records.len())
    }
}

/// Logs every record as a JSON line.
pub struct LogSink {
    classifier: Classifier,
}

impl LogSink {
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl VehicleSink for LogSink {
    async fn publish(&mut self, records: &[VehicleRecord]) -> Result<usize> {
        for record in records {
            let row = VehicleRow::new(record, &self.classifier);
            info!(vehicle = %serde_json::to_string(&row)?, "Vehicle");
        }
        Ok(records.len())
    }
}

/// Appends a [`CycleStats`] record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record(path: &str, stats: &CycleStats) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(stats)?;
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gtfs_rt::VehiclePosition;
    use std::fs;

    fn record(vehicle_id: &str, route_id: Option<&str>) -> VehicleRecord {
        let mut r = VehicleRecord::from_position(VehiclePosition::default(), Some(1_700_000_000));
        r.vehicle_id = Some(vehicle_id.to_string());
        r.route_id = route_id.map(String::from);
        r.latitude = Some(-34.9);
        r.longitude = Some(138.6);
        r
    }

    #[tokio::test]
    async fn test_csv_sink_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vehicles.csv");
        let mut sink = CsvSink::new(&path, Classifier::default());

        let written = sink
            .publish(&[record("1", Some("GLNELG")), record("2", Some("743"))])
            .await
            .unwrap();
        assert_eq!(written, 2);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("vehicle_id,"));
        assert!(lines[0].ends_with(",vehicle_type"));
        assert!(lines[1].starts_with("1,"));
        assert!(lines[1].ends_with(",Tram"));
        assert!(lines[2].ends_with(",Bus"));
    }

    #[tokio::test]
    async fn test_csv_sink_replaces_previous_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vehicles.csv");
        let mut sink = CsvSink::new(&path, Classifier::default());

        sink.publish(&[record("1", None), record("2", None)]).await.unwrap();
        sink.publish(&[record("3", None)]).await.unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("\n3,"));
    }

    #[tokio::test]
    async fn test_log_sink_counts_records() {
        let mut sink = LogSink::new(Classifier::default());
        assert_eq!(sink.publish(&[record("1", None)]).await.unwrap(), 1);
    }

    #[test]
    fn test_append_record_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cycles.csv");
        let path = path.to_str().unwrap();

        let stats = CycleStats::default();
        append_record(path, &stats).unwrap();
        append_record(path, &stats).unwrap();

        let content = fs::read_to_string(path).unwrap();
        let header_count = content.lines().filter(|l| l.starts_with("timestamp")).count();
        assert_eq!(header_count, 1);
        assert_eq!(content.lines().count(), 3);
        assert!(content.contains(",framing_error,header_error,"));
    }
}
