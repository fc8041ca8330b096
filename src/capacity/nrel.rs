use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tracing::{info, warn};

use crate::capacity::bucket::limit_coordinates;
use crate::capacity::{CapacityError, CapacityRecord, Coordinate};

pub const BASE_URL: &str = "https://developer.nrel.gov/api/solar/solar_resource/v1.json";

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Irradiance quantity reported by the solar resource API
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SolarMetric {
    /// Direct normal irradiance
    Dni,
    /// Global horizontal irradiance
    Ghi,
    LatTilt,
}

impl SolarMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            SolarMetric::Dni => "avg_dni",
            SolarMetric::Ghi => "avg_ghi",
            SolarMetric::LatTilt => "avg_lat_tilt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourcePeriod {
    Annual,
    /// Month number, 1 = January
    Monthly(u32),
}

#[derive(Debug, Clone)]
pub struct SolarQuery {
    pub metric: SolarMetric,
    pub period: ResourcePeriod,
    pub precision: usize,
    pub delay: Duration,
    /// Log the number of requests that would be made and return nothing
    pub dry_run: bool,
    pub progress_every: usize,
}

impl Default for SolarQuery {
    fn default() -> Self {
        Self {
            metric: SolarMetric::Dni,
            period: ResourcePeriod::Annual,
            precision: 5,
            delay: Duration::ZERO,
            dry_run: false,
            progress_every: 100,
        }
    }
}

/// Pick the coordinates to query from whichever source was supplied.
///
/// An explicit coordinate list wins over records, which win over separate
/// latitude/longitude lists.
pub fn resolve_coordinates(
    coordinates: Option<&[Coordinate]>,
    records: Option<&[CapacityRecord]>,
    lat: Option<&[f64]>,
    lon: Option<&[f64]>,
) -> Result<Vec<Coordinate>, CapacityError> {
    if let Some(coords) = coordinates {
        return Ok(coords.to_vec());
    }
    if let Some(records) = records {
        return Ok(crate::capacity::coordinates(records));
    }
    match (lat, lon) {
        (Some(lat), Some(lon)) => {
            if lat.len() != lon.len() {
                return Err(CapacityError::InvalidArgument(format!(
                    "lat and lon lists differ in length ({} vs {})",
                    lat.len(),
                    lon.len()
                )));
            }
            Ok(lat.iter().copied().zip(lon.iter().copied()).collect())
        }
        _ => Err(CapacityError::InvalidArgument(
            "coordinates not given".to_string(),
        )),
    }
}

/// Pull one value out of a solar resource response body
pub fn extract_value(
    body: &Value,
    metric: SolarMetric,
    period: ResourcePeriod,
) -> Result<f64, CapacityError> {
    let pointer = match period {
        ResourcePeriod::Annual => format!("/outputs/{}/annual", metric.as_str()),
        ResourcePeriod::Monthly(month) => {
            let name = month
                .checked_sub(1)
                .and_then(|m| MONTHS.get(m as usize))
                .ok_or_else(|| CapacityError::InvalidArgument(format!("invalid month {}", month)))?;
            format!("/outputs/{}/monthly/{}", metric.as_str(), name)
        }
    };

    body.pointer(&pointer)
        .and_then(Value::as_f64)
        .ok_or_else(|| CapacityError::InvalidResponse(format!("no numeric value at {}", pointer)))
}

pub struct NrelClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl NrelClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    #[cfg(test)]
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn request_url(&self, lat: f64, lon: f64) -> Result<Url, CapacityError> {
        Url::parse_with_params(
            &self.base_url,
            &[
                ("api_key", self.api_key.clone()),
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
            ],
        )
        .map_err(|e| CapacityError::InvalidArgument(format!("bad base url: {}", e)))
    }

    async fn fetch_text(&self, lat: f64, lon: f64) -> Result<(StatusCode, String), CapacityError> {
        let url = self.request_url(lat, lon)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }

    /// Fetch the requested irradiance value at one location
    pub async fn fetch_value(
        &self,
        lat: f64,
        lon: f64,
        metric: SolarMetric,
        period: ResourcePeriod,
    ) -> Result<f64, CapacityError> {
        let (status, text) = self.fetch_text(lat, lon).await?;
        let body: Value = serde_json::from_str(&text)
            .map_err(|e| CapacityError::InvalidResponse(format!("{}: {}", status, e)))?;

        if status != StatusCode::OK {
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string());
            return Err(CapacityError::Api(message));
        }

        extract_value(&body, metric, period)
    }

    /// Query one value per geohash bucket and spread it over the bucket's coordinates.
    ///
    /// A bucket whose request fails is logged and its coordinates get 0.0.
    pub async fn query_solar_capacities(
        &self,
        coordinates: &[Coordinate],
        query: &SolarQuery,
    ) -> Result<Vec<CapacityRecord>, CapacityError> {
        let bucketed = limit_coordinates(coordinates, query.precision)?;
        let total = bucketed.bucket_count();

        if query.dry_run {
            info!(
                "would make {} requests to the NREL API for {} datapoints",
                total,
                bucketed.tagged.len()
            );
            return Ok(Vec::new());
        }

        let mut values: HashMap<&str, f64> = HashMap::new();
        for (count, (hash, (lat, lon))) in bucketed.centres.iter().enumerate() {
            if query.progress_every > 0 && (count + 1) % query.progress_every == 0 {
                info!("made {} requests of {}", count + 1, total);
            }

            match self.fetch_value(*lat, *lon, query.metric, query.period).await {
                Ok(value) => {
                    values.insert(hash.as_str(), value);
                }
                Err(e) => warn!("solar query for bucket {} failed: {}", hash, e),
            }

            if !query.delay.is_zero() {
                tokio::time::sleep(query.delay).await;
            }
        }

        info!("{} of {} bucket queries succeeded", values.len(), total);

        Ok(bucketed
            .tagged
            .iter()
            .map(|((lat, lon), hash)| {
                CapacityRecord::new(*lat, *lon, values.get(hash.as_str()).copied().unwrap_or(0.0))
            })
            .collect())
    }

    /// Write each bucket's raw response body to `path`, one per line
    pub async fn save_raw_responses(
        &self,
        coordinates: &[Coordinate],
        precision: usize,
        delay: Duration,
        path: &Path,
    ) -> Result<usize, CapacityError> {
        let bucketed = limit_coordinates(coordinates, precision)?;
        let mut writer = BufWriter::new(File::create(path)?);

        for (_, (lat, lon)) in &bucketed.centres {
            let (_, text) = self.fetch_text(*lat, *lon).await?;
            writeln!(writer, "{}", text.trim_end())?;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
        writer.flush()?;

        info!(
            "saved {} raw responses to {}",
            bucketed.bucket_count(),
            path.display()
        );
        Ok(bucketed.bucket_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, extract::Query, routing::get};
    use serde_json::json;

    const DENVER: Coordinate = (39.7392, -104.9903);
    const DENVER_EAST: Coordinate = (39.7395, -104.9880);
    const CHICAGO: Coordinate = (41.8781, -87.6298);

    // Answers for latitudes below 40 and rejects the rest
    async fn mock_solar(Query(params): Query<HashMap<String, String>>) -> (StatusCode, String) {
        if params.get("api_key").map(String::as_str) != Some("test-key") {
            let body = json!({"error": {"code": "API_KEY_MISSING", "message": "no key"}});
            return (StatusCode::FORBIDDEN, body.to_string());
        }
        let lat: f64 = params
            .get("lat")
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();
        if lat > 40.0 {
            let body = json!({"error": {"code": "OVER_RATE_LIMIT", "message": "slow down"}});
            return (StatusCode::TOO_MANY_REQUESTS, body.to_string());
        }
        let body = json!({
            "outputs": {
                "avg_dni": {"annual": 6.5, "monthly": {"jan": 4.25}},
                "avg_ghi": "no data"
            }
        });
        (StatusCode::OK, body.to_string())
    }

    async fn spawn_mock() -> String {
        let app = Router::new().route("/solar", get(mock_solar));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/solar", addr)
    }

    fn client(base_url: String, key: &str) -> NrelClient {
        NrelClient::with_base_url(key, base_url)
            .with_http_client(Client::builder().no_proxy().build().unwrap())
    }

    #[test]
    fn test_resolve_coordinates_precedence() {
        let records = vec![CapacityRecord::new(1.0, 2.0, 3.0)];
        let coords = resolve_coordinates(Some(&[(5.0, 6.0)][..]), Some(&records), None, None).unwrap();
        assert_eq!(coords, vec![(5.0, 6.0)]);

        let coords = resolve_coordinates(None, Some(&records), None, None).unwrap();
        assert_eq!(coords, vec![(1.0, 2.0)]);

        let coords =
            resolve_coordinates(None, None, Some(&[1.0, 2.0][..]), Some(&[3.0, 4.0][..])).unwrap();
        assert_eq!(coords, vec![(1.0, 3.0), (2.0, 4.0)]);
    }

    #[test]
    fn test_resolve_coordinates_errors() {
        assert!(matches!(
            resolve_coordinates(None, None, Some(&[1.0, 2.0][..]), Some(&[3.0][..])),
            Err(CapacityError::InvalidArgument(_))
        ));
        assert!(matches!(
            resolve_coordinates(None, None, None, None),
            Err(CapacityError::InvalidArgument(_))
        ));
        assert!(resolve_coordinates(None, None, Some(&[1.0][..]), None).is_err());
    }

    #[test]
    fn test_extract_value_paths() {
        let body = json!({"outputs": {"avg_dni": {"annual": 6.5, "monthly": {"feb": 5.0}}}});
        assert_eq!(
            extract_value(&body, SolarMetric::Dni, ResourcePeriod::Annual).unwrap(),
            6.5
        );
        assert_eq!(
            extract_value(&body, SolarMetric::Dni, ResourcePeriod::Monthly(2)).unwrap(),
            5.0
        );
        assert!(extract_value(&body, SolarMetric::Ghi, ResourcePeriod::Annual).is_err());
        assert!(extract_value(&body, SolarMetric::Dni, ResourcePeriod::Monthly(13)).is_err());
        assert!(extract_value(&body, SolarMetric::Dni, ResourcePeriod::Monthly(0)).is_err());
    }

    #[tokio::test]
    async fn test_failed_bucket_defaults_to_zero() {
        let nrel = client(spawn_mock().await, "test-key");
        // the failing bucket is queried first, the Denver bucket after it
        let coords = vec![CHICAGO, DENVER, DENVER_EAST];

        let records = nrel
            .query_solar_capacities(&coords, &SolarQuery::default())
            .await
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].capacity, 0.0);
        assert_eq!(records[0].lat, CHICAGO.0);
        assert_eq!(records[1].capacity, 6.5);
        assert_eq!(records[2].capacity, 6.5);
    }

    #[tokio::test]
    async fn test_monthly_and_missing_metric() {
        let nrel = client(spawn_mock().await, "test-key");

        let monthly = SolarQuery {
            period: ResourcePeriod::Monthly(1),
            ..SolarQuery::default()
        };
        let records = nrel.query_solar_capacities(&[DENVER], &monthly).await.unwrap();
        assert_eq!(records[0].capacity, 4.25);

        let ghi = SolarQuery {
            metric: SolarMetric::Ghi,
            ..SolarQuery::default()
        };
        let records = nrel.query_solar_capacities(&[DENVER], &ghi).await.unwrap();
        assert_eq!(records[0].capacity, 0.0);
    }

    #[tokio::test]
    async fn test_api_error_message_is_surfaced() {
        let nrel = client(spawn_mock().await, "wrong-key");
        let err = nrel
            .fetch_value(DENVER.0, DENVER.1, SolarMetric::Dni, ResourcePeriod::Annual)
            .await
            .unwrap_err();
        assert!(matches!(err, CapacityError::Api(ref msg) if msg == "no key"));
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_requests() {
        // nothing listens on the discard port
        let nrel = client("http://127.0.0.1:9/solar".to_string(), "test-key");
        let query = SolarQuery {
            dry_run: true,
            ..SolarQuery::default()
        };
        let records = nrel
            .query_solar_capacities(&[DENVER, CHICAGO], &query)
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_save_raw_responses_one_line_per_bucket() {
        let nrel = client(spawn_mock().await, "test-key");
        let path = std::env::temp_dir().join(format!("recap-raw-{}.txt", std::process::id()));

        let written = nrel
            .save_raw_responses(&[DENVER, DENVER_EAST, CHICAGO], 5, Duration::ZERO, &path)
            .await
            .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(written, 2);
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().next().unwrap().contains("avg_dni"));
    }
}
