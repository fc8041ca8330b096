pub(crate) mod bucket;
pub(crate) mod extract;
pub(crate) mod geohash;
pub(crate) mod nrel;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CapacityError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::XlsxError),
    #[error("missing column '{0}'")]
    MissingColumn(String),
    #[error("no geohash bucket holds data from both datasets")]
    NoOverlap,
}

/// A latitude/longitude pair in degrees
pub type Coordinate = (f64, f64);

/// One measured or aggregated capacity value at a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityRecord {
    pub lat: f64,
    pub lon: f64,
    pub capacity: f64,
    pub label: Option<String>,
}

impl CapacityRecord {
    pub fn new(lat: f64, lon: f64, capacity: f64) -> Self {
        Self {
            lat,
            lon,
            capacity,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        (self.lat, self.lon)
    }
}

/// Collect the coordinates of a record set
pub fn coordinates(records: &[CapacityRecord]) -> Vec<Coordinate> {
    records.iter().map(CapacityRecord::coordinate).collect()
}

/// The `n` records with the largest capacity, largest first
pub fn top_n(records: &[CapacityRecord], n: usize) -> Vec<CapacityRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| {
        b.capacity
            .partial_cmp(&a.capacity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.truncate(n);
    sorted
}

/// Records whose capacity is at least `threshold`
pub fn at_least(records: &[CapacityRecord], threshold: f64) -> Vec<CapacityRecord> {
    records
        .iter()
        .filter(|r| r.capacity >= threshold)
        .cloned()
        .collect()
}

/// Drop the zero placeholders left behind by failed solar queries
pub fn drop_zero_capacity(records: Vec<CapacityRecord>) -> Vec<CapacityRecord> {
    records.into_iter().filter(|r| r.capacity != 0.0).collect()
}
