use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::debug;

use crate::capacity::geohash::{decode, encode};
use crate::capacity::{CapacityError, CapacityRecord, Coordinate};

/// Which record survives when several share a geohash bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupPolicy {
    #[default]
    First,
    Last,
    /// First record's position, mean capacity of the bucket
    Mean,
}

/// Input coordinates tagged with their bucket, plus one query point per bucket
#[derive(Debug, Clone)]
pub struct BucketedCoordinates {
    pub tagged: Vec<(Coordinate, String)>,
    /// Bucket key to cell centre, in first-appearance order
    pub centres: Vec<(String, Coordinate)>,
}

impl BucketedCoordinates {
    pub fn bucket_count(&self) -> usize {
        self.centres.len()
    }
}

pub fn limit_coordinates(
    coordinates: &[Coordinate],
    precision: usize,
) -> Result<BucketedCoordinates, CapacityError> {
    let mut tagged = Vec::with_capacity(coordinates.len());
    let mut centres = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for &(lat, lon) in coordinates {
        let hash = encode(lat, lon, precision)?;
        if seen.insert(hash.clone()) {
            centres.push((hash.clone(), decode(&hash)?));
        }
        tagged.push(((lat, lon), hash));
    }

    Ok(BucketedCoordinates { tagged, centres })
}

/// Keep one record per geohash bucket
pub fn limit_records(
    records: &[CapacityRecord],
    precision: usize,
    policy: DedupPolicy,
) -> Result<Vec<CapacityRecord>, CapacityError> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&CapacityRecord>> = HashMap::new();

    for record in records {
        let hash = encode(record.lat, record.lon, precision)?;
        groups
            .entry(hash.clone())
            .or_insert_with(|| {
                order.push(hash);
                Vec::new()
            })
            .push(record);
    }

    let limited: Vec<CapacityRecord> = order
        .iter()
        .filter_map(|hash| groups.get(hash))
        .filter_map(|group| match policy {
            DedupPolicy::First => group.first().map(|r| (*r).clone()),
            DedupPolicy::Last => group.last().map(|r| (*r).clone()),
            DedupPolicy::Mean => group.first().map(|r| CapacityRecord {
                capacity: mean(group.iter().map(|r| r.capacity)),
                ..(*r).clone()
            }),
        })
        .collect();

    debug!(
        "limited {} records to {} buckets at precision {}",
        records.len(),
        limited.len(),
        precision
    );

    Ok(limited)
}

/// Median over shared buckets of mean(`a`) / mean(`b`)
pub fn wind_scaling_factor(
    a: &[CapacityRecord],
    b: &[CapacityRecord],
    precision: usize,
) -> Result<f64, CapacityError> {
    let mut buckets: HashMap<String, (Vec<f64>, Vec<f64>)> = HashMap::new();

    for record in a {
        let hash = encode(record.lat, record.lon, precision)?;
        buckets.entry(hash).or_default().0.push(record.capacity);
    }
    for record in b {
        let hash = encode(record.lat, record.lon, precision)?;
        buckets.entry(hash).or_default().1.push(record.capacity);
    }

    let mut ratios: Vec<f64> = buckets
        .values()
        .filter(|(left, right)| !left.is_empty() && !right.is_empty())
        .filter_map(|(left, right)| {
            let denominator = mean(right.iter().copied());
            if denominator == 0.0 {
                None
            } else {
                Some(mean(left.iter().copied()) / denominator)
            }
        })
        .collect();

    debug!("{} buckets shared between datasets", ratios.len());

    median(&mut ratios).ok_or(CapacityError::NoOverlap)
}

/// Copies of `records` with capacity multiplied by `factor`
pub fn apply_scaling(records: &[CapacityRecord], factor: f64) -> Vec<CapacityRecord> {
    records
        .iter()
        .map(|r| CapacityRecord {
            capacity: r.capacity * factor,
            ..r.clone()
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
