use geohash::{Coord, GeohashError};

use crate::capacity::{CapacityError, Coordinate};

pub const MAX_PRECISION: usize = 12;

fn invalid(e: GeohashError) -> CapacityError {
    CapacityError::InvalidArgument(format!("geohash: {}", e))
}

/// Encode a coordinate as a geohash of `precision` characters
pub fn encode(lat: f64, lon: f64, precision: usize) -> Result<String, CapacityError> {
    if precision == 0 || precision > MAX_PRECISION {
        return Err(CapacityError::InvalidArgument(format!(
            "geohash precision must be within 1..={}, got {}",
            MAX_PRECISION, precision
        )));
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(CapacityError::InvalidArgument(format!(
            "coordinate out of range: ({}, {})",
            lat, lon
        )));
    }

    geohash::encode(Coord { x: lon, y: lat }, precision).map_err(invalid)
}

/// Latitude and longitude intervals covered by a geohash cell
pub fn bounds(hash: &str) -> Result<((f64, f64), (f64, f64)), CapacityError> {
    if hash.is_empty() {
        return Err(CapacityError::InvalidArgument("empty geohash".to_string()));
    }

    let rect = geohash::decode_bbox(hash).map_err(invalid)?;
    let (min, max) = (rect.min(), rect.max());
    Ok(((min.y, max.y), (min.x, max.x)))
}

/// Decode a geohash to the centre of its cell
pub fn decode(hash: &str) -> Result<Coordinate, CapacityError> {
    let ((lat_min, lat_max), (lon_min, lon_max)) = bounds(hash)?;
    Ok(((lat_min + lat_max) / 2.0, (lon_min + lon_max) / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_reference_values() {
        assert_eq!(encode(42.6, -5.6, 5).unwrap(), "ezs42");
        assert_eq!(encode(57.64911, 10.40744, 11).unwrap(), "u4pruydqqvj");
    }

    #[test]
    fn test_prefix_property() {
        let long = encode(39.7392, -104.9903, 9).unwrap();
        for p in 1..=9 {
            assert_eq!(encode(39.7392, -104.9903, p).unwrap(), long[..p]);
        }
    }

    #[test]
    fn test_decode_is_cell_centre() {
        let (lat, lon) = decode("ezs42").unwrap();
        assert!((lat - 42.60498046875).abs() < 1e-9);
        assert!((lon - -5.60302734375).abs() < 1e-9);
        assert_eq!(encode(lat, lon, 5).unwrap(), "ezs42");
    }

    #[test]
    fn test_bounds_contain_encoded_point() {
        let ((lat_min, lat_max), (lon_min, lon_max)) = bounds("9xj64").unwrap();
        assert!(lat_min <= 39.7392 && 39.7392 <= lat_max);
        assert!(lon_min <= -104.9903 && -104.9903 <= lon_max);
        assert!(lat_max - lat_min < 0.05);
    }

    #[test]
    fn test_rejects_invalid_input() {
        assert!(encode(91.0, 0.0, 5).is_err());
        assert!(encode(0.0, 0.0, 0).is_err());
        assert!(encode(0.0, 0.0, 13).is_err());
        assert!(encode(f64::NAN, 0.0, 5).is_err());
        assert!(decode("ezs4a").is_err());
        assert!(decode("").is_err());
    }
}
