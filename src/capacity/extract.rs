use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{DataType, Range, Reader, Xlsx};
use geojson::{GeoJson, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::capacity::{CapacityError, CapacityRecord};

const PLANT_ID: &str = "Plant ID";
const LATITUDE: &str = "Latitude";
const LONGITUDE: &str = "Longitude";
const NAMEPLATE: &str = "Nameplate Capacity (MW)";
const PLANT_NAME: &str = "Plant Name";
const TECHNOLOGY: &str = "Technology";

/// Rows scanned for the spreadsheet header before giving up
const HEADER_SEARCH_ROWS: usize = 10;

static TECHNOLOGY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r".*\((.*)\)").expect("technology pattern is valid"));

/// The two NREL wind toolkit site files name their capacity factor differently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindRegion {
    West,
    East,
}

impl WindRegion {
    pub fn capacity_property(&self) -> &'static str {
        match self {
            WindRegion::West => "capacity_factor",
            WindRegion::East => "net_capacity_factor",
        }
    }
}

pub fn extract_wind_capacities(
    path: &Path,
    region: WindRegion,
) -> Result<Vec<CapacityRecord>, CapacityError> {
    let reader = BufReader::new(File::open(path)?);
    let geojson = GeoJson::from_reader(reader).map_err(geojson::Error::from)?;
    let records = wind_records(geojson, region)?;
    info!(
        "extracted {} {:?} wind sites from {}",
        records.len(),
        region,
        path.display()
    );
    Ok(records)
}

pub fn wind_records(
    geojson: GeoJson,
    region: WindRegion,
) -> Result<Vec<CapacityRecord>, CapacityError> {
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => {
            return Err(CapacityError::InvalidArgument(
                "wind site metadata must be a FeatureCollection".to_string(),
            ));
        }
    };

    let property = region.capacity_property();
    let records = collection
        .features
        .into_iter()
        .filter_map(|feature| {
            let point = match feature.geometry.map(|g| g.value) {
                Some(Value::Point(point)) if point.len() >= 2 => point,
                _ => return None,
            };
            let capacity = feature
                .properties
                .as_ref()
                .and_then(|props| props.get(property))
                .and_then(|v| v.as_f64())?;
            Some(CapacityRecord::new(point[1], point[0], capacity))
        })
        .collect();

    Ok(records)
}

/// One generator row of the plant spreadsheet
#[derive(Debug, Clone, PartialEq)]
pub struct PlantRow {
    pub plant_id: String,
    pub lat: f64,
    pub lon: f64,
    pub capacity: f64,
    pub name: String,
    pub technology: String,
}

pub fn extract_power_plant_capacities(path: &Path) -> Result<Vec<CapacityRecord>, CapacityError> {
    let mut workbook: Xlsx<_> = calamine::open_workbook(path)?;
    let sheet = workbook.worksheet_range_at(0).ok_or_else(|| {
        CapacityError::InvalidArgument(format!("{} has no worksheets", path.display()))
    })??;

    let rows = plant_rows(&sheet)?;
    let plants = aggregate_plants(rows);
    info!("extracted {} power plants from {}", plants.len(), path.display());
    Ok(plants)
}

/// Read generator rows below the header, skipping any with unusable cells
pub fn plant_rows(sheet: &Range<DataType>) -> Result<Vec<PlantRow>, CapacityError> {
    let header_row = sheet
        .rows()
        .take(HEADER_SEARCH_ROWS)
        .position(|row| row.iter().any(|c| cell_text(c).as_deref() == Some(PLANT_ID)))
        .ok_or_else(|| CapacityError::MissingColumn(PLANT_ID.to_string()))?;

    let header: Vec<String> = sheet
        .rows()
        .nth(header_row)
        .map(|row| row.iter().map(|c| cell_text(c).unwrap_or_default()).collect())
        .unwrap_or_default();

    let find_col = |name: &str| {
        header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| CapacityError::MissingColumn(name.to_string()))
    };
    let id_col = find_col(PLANT_ID)?;
    let lat_col = find_col(LATITUDE)?;
    let lon_col = find_col(LONGITUDE)?;
    let capacity_col = find_col(NAMEPLATE)?;
    let name_col = find_col(PLANT_NAME)?;
    let tech_col = find_col(TECHNOLOGY)?;

    let mut rows = Vec::new();
    for (idx, row) in sheet.rows().enumerate().skip(header_row + 1) {
        let parsed = parse_plant_row(
            row,
            [id_col, lat_col, lon_col, capacity_col, name_col, tech_col],
        );

        match parsed {
            Some(plant_row) => rows.push(plant_row),
            None => debug!("skipping incomplete spreadsheet row {}", idx),
        }
    }

    Ok(rows)
}

fn parse_plant_row(row: &[DataType], cols: [usize; 6]) -> Option<PlantRow> {
    let [id, lat, lon, capacity, name, technology] = cols;
    Some(PlantRow {
        plant_id: cell_text(row.get(id)?)?,
        lat: cell_f64(row.get(lat)?)?,
        lon: cell_f64(row.get(lon)?)?,
        capacity: cell_f64(row.get(capacity)?)?,
        name: cell_text(row.get(name)?)?,
        technology: cell_text(row.get(technology)?)?,
    })
}

/// Sum capacities per plant; position and label come from the plant's first row
pub fn aggregate_plants(rows: Vec<PlantRow>) -> Vec<CapacityRecord> {
    let mut order: Vec<String> = Vec::new();
    let mut plants: HashMap<String, CapacityRecord> = HashMap::new();

    for row in rows {
        match plants.get_mut(&row.plant_id) {
            Some(plant) => plant.capacity += row.capacity,
            None => {
                let record = CapacityRecord::new(row.lat, row.lon, row.capacity)
                    .with_label(format!("{} ({})", row.name, row.technology));
                order.push(row.plant_id.clone());
                plants.insert(row.plant_id, record);
            }
        }
    }

    order
        .iter()
        .filter_map(|id| plants.remove(id))
        .collect()
}

/// Technology inside the trailing parentheses of a plant label
pub fn technology_of(label: &str) -> Option<String> {
    TECHNOLOGY_RE
        .captures(label)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn cell_text(cell: &DataType) -> Option<String> {
    match cell {
        DataType::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        DataType::Int(i) => Some(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 => Some(format!("{}", *f as i64)),
        DataType::Float(f) => Some(f.to_string()),
        _ => None,
    }
}

fn cell_f64(cell: &DataType) -> Option<f64> {
    match cell {
        DataType::Float(f) => Some(*f),
        DataType::Int(i) => Some(*i as f64),
        DataType::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct SolarRow {
    lat: f64,
    lon: f64,
    capacity: f64,
}

#[derive(Debug, Serialize)]
struct IndexedSolarRow {
    #[serde(rename = "")]
    index: usize,
    lat: f64,
    lon: f64,
    capacity: f64,
}

/// Read a solar capacity CSV with `lat`, `lon` and `capacity` columns
pub fn read_solar_capacities(path: &Path) -> Result<Vec<CapacityRecord>, CapacityError> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        let row: SolarRow = row?;
        records.push(CapacityRecord::new(row.lat, row.lon, row.capacity));
    }
    info!("read {} solar capacities from {}", records.len(), path.display());
    Ok(records)
}

/// Write solar capacities with a leading unnamed index column
pub fn write_solar_capacities(path: &Path, records: &[CapacityRecord]) -> Result<(), CapacityError> {
    let mut writer = csv::Writer::from_path(path)?;
    for (index, record) in records.iter().enumerate() {
        writer.serialize(IndexedSolarRow {
            index,
            lat: record.lat,
            lon: record.lon,
            capacity: record.capacity,
        })?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-104.99, 39.74]},
             "properties": {"capacity_factor": 0.31, "net_capacity_factor": 0.27}},
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-87.63, 41.88]},
             "properties": {"net_capacity_factor": 0.22}},
            {"type": "Feature", "geometry": {"type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]]},
             "properties": {"capacity_factor": 0.5}}
        ]
    }"#;

    #[test]
    fn test_wind_records_west_property() {
        let geojson: GeoJson = SITES.parse().unwrap();
        let records = wind_records(geojson, WindRegion::West).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].lat, 39.74);
        assert_eq!(records[0].lon, -104.99);
        assert_eq!(records[0].capacity, 0.31);
    }

    #[test]
    fn test_wind_records_east_property() {
        let geojson: GeoJson = SITES.parse().unwrap();
        let records = wind_records(geojson, WindRegion::East).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].capacity, 0.27);
        assert_eq!(records[1].capacity, 0.22);
    }

    #[test]
    fn test_extract_wind_capacities_from_file() {
        let path = std::env::temp_dir().join(format!("recap-wind-{}.json", std::process::id()));
        std::fs::write(&path, SITES).unwrap();

        let records = extract_wind_capacities(&path, WindRegion::East).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].lat, 39.74);
        assert_eq!(records[1].capacity, 0.22);
    }

    #[test]
    fn test_extract_wind_capacities_rejects_malformed_file() {
        let path = std::env::temp_dir().join(format!("recap-wind-bad-{}.json", std::process::id()));
        std::fs::write(&path, "{ not geojson").unwrap();

        let result = extract_wind_capacities(&path, WindRegion::West);
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(result, Err(CapacityError::GeoJson(_))));
    }

    #[test]
    fn test_wind_records_rejects_single_feature() {
        let geojson: GeoJson = r#"{"type": "Feature", "geometry": null, "properties": {}}"#
            .parse()
            .unwrap();
        assert!(wind_records(geojson, WindRegion::East).is_err());
    }

    fn plant_sheet() -> Range<DataType> {
        let header = [
            " Plant ID ",
            "Plant Name",
            "Technology",
            "Nameplate Capacity (MW)",
            "Latitude",
            "Longitude ",
        ];
        let mut sheet = Range::new((0, 0), (5, 5));
        sheet.set_value((0, 0), DataType::String("December 2017 Generators".to_string()));
        for (col, name) in header.iter().enumerate() {
            sheet.set_value((1, col as u32), DataType::String(name.to_string()));
        }

        let rows: [(f64, &str, &str, f64, f64, f64); 3] = [
            (3.0, "Barry", "Natural Gas", 50.0, 31.0069, -88.0103),
            (7.0, "Walter Bouldin Dam", "Hydroelectric", 75.0, 32.5839, -86.2833),
            (3.0, "Barry", "Natural Gas", 30.0, 31.0, -88.0),
        ];
        for (i, (id, name, tech, cap, lat, lon)) in rows.iter().enumerate() {
            let r = i as u32 + 2;
            sheet.set_value((r, 0), DataType::Float(*id));
            sheet.set_value((r, 1), DataType::String(name.to_string()));
            sheet.set_value((r, 2), DataType::String(tech.to_string()));
            sheet.set_value((r, 3), DataType::Float(*cap));
            sheet.set_value((r, 4), DataType::Float(*lat));
            sheet.set_value((r, 5), DataType::Float(*lon));
        }

        // row without a capacity
        sheet.set_value((5, 0), DataType::Int(9));
        sheet.set_value((5, 1), DataType::String("Broken".to_string()));
        sheet.set_value((5, 2), DataType::String("Solar".to_string()));
        sheet.set_value((5, 4), DataType::Float(30.0));
        sheet.set_value((5, 5), DataType::Float(-90.0));
        sheet
    }

    #[test]
    fn test_plant_rows_trims_header_and_skips_incomplete() {
        let rows = plant_rows(&plant_sheet()).unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].plant_id, "3");
        assert_eq!(rows[1].technology, "Hydroelectric");
    }

    #[test]
    fn test_aggregate_sums_capacity_per_plant() {
        let plants = aggregate_plants(plant_rows(&plant_sheet()).unwrap());

        assert_eq!(plants.len(), 2);
        assert_eq!(plants[0].capacity, 80.0);
        assert_eq!(plants[0].lat, 31.0069);
        assert_eq!(plants[0].label.as_deref(), Some("Barry (Natural Gas)"));
        assert_eq!(plants[1].capacity, 75.0);
    }

    #[test]
    fn test_plant_rows_missing_column() {
        let mut sheet = Range::new((0, 0), (1, 1));
        sheet.set_value((0, 0), DataType::String("Plant ID".to_string()));
        sheet.set_value((0, 1), DataType::String("Latitude".to_string()));
        assert!(matches!(
            plant_rows(&sheet),
            Err(CapacityError::MissingColumn(col)) if col == LONGITUDE
        ));
    }

    #[test]
    fn test_technology_of() {
        assert_eq!(
            technology_of("Barry (Natural Gas Fired Combined Cycle)").as_deref(),
            Some("Natural Gas Fired Combined Cycle")
        );
        assert_eq!(technology_of("No technology"), None);
    }

    #[test]
    fn test_solar_csv_through_file() {
        let path = std::env::temp_dir().join(format!("recap-solar-{}.csv", std::process::id()));
        let records = vec![
            CapacityRecord::new(39.74, -104.99, 5.61),
            CapacityRecord::new(41.88, -87.63, 0.0),
        ];

        write_solar_capacities(&path, &records).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(",lat,lon,capacity"));

        let read = read_solar_capacities(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(read, records);
    }
}
