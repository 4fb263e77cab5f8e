use std::fmt::Debug;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;

use crate::{
    Config,
    aggregate::build_snapshot,
    error::FetchError,
    http,
    model::{Coordinates, WeatherSnapshot},
    raw::RawForecast,
};

/// Days of history requested by default. The API rejects anything above 92.
pub const DEFAULT_PAST_DAYS: u8 = 90;

pub const HOURLY_FIELDS: &[&str] = &[
    "temperature_2m",
    "relativehumidity_2m",
    "precipitation",
    "pressure_msl",
    "weathercode",
];

pub const DAILY_FIELDS: &[&str] = &[
    "weathercode",
    "temperature_2m_max",
    "temperature_2m_min",
    "precipitation_sum",
    "uv_index_max",
];

#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn get_weather(&self, coords: Coordinates) -> Result<WeatherSnapshot, FetchError>;
}

#[derive(Debug, Clone)]
pub struct OpenMeteoForecast {
    http: Client,
    base_url: String,
    past_days: u8,
}

impl OpenMeteoForecast {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            past_days: DEFAULT_PAST_DAYS,
        }
    }

    pub fn from_config(http: Client, config: &Config) -> Self {
        Self::new(http, config.endpoints.forecast.clone()).with_past_days(config.past_days)
    }

    /// Values above the API limit are passed through and rejected upstream.
    pub fn with_past_days(mut self, past_days: u8) -> Self {
        self.past_days = past_days;
        self
    }

    pub fn query(&self, coords: Coordinates) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", coords.lat.to_string()),
            ("longitude", coords.lon.to_string()),
            ("timezone", "auto".to_string()),
            ("temperature_unit", "celsius".to_string()),
            ("windspeed_unit", "kmh".to_string()),
            ("precipitation_unit", "mm".to_string()),
            ("current_weather", "true".to_string()),
            ("past_days", self.past_days.to_string()),
            ("timeformat", "iso8601".to_string()),
            ("hourly", HOURLY_FIELDS.join(",")),
            ("daily", DAILY_FIELDS.join(",")),
        ]
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoForecast {
    async fn get_weather(&self, coords: Coordinates) -> Result<WeatherSnapshot, FetchError> {
        let raw: RawForecast =
            http::get_json(&self.http, &self.base_url, &self.query(coords), None).await?;

        let now = Utc::now();
        let snapshot = build_snapshot(&raw, now.date_naive(), now);

        tracing::info!(
            %coords,
            hourly = snapshot.hourly.len(),
            daily = snapshot.daily.len(),
            months = snapshot.series.len(),
            "Weather aggregated"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDateTime};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn forecast(server: &MockServer) -> OpenMeteoForecast {
        OpenMeteoForecast::new(Client::new(), format!("{}/v1/forecast", server.uri()))
    }

    #[test]
    fn query_carries_all_fixed_parameters() {
        let f = OpenMeteoForecast::new(Client::new(), "http://localhost");
        let query = f.query(Coordinates::new(52.52, 13.41));
        let get = |k: &str| {
            query
                .iter()
                .find(|(name, _)| *name == k)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("latitude"), Some("52.52"));
        assert_eq!(get("longitude"), Some("13.41"));
        assert_eq!(get("timezone"), Some("auto"));
        assert_eq!(get("past_days"), Some("90"));
        assert_eq!(get("current_weather"), Some("true"));
        assert_eq!(
            get("hourly"),
            Some("temperature_2m,relativehumidity_2m,precipitation,pressure_msl,weathercode")
        );
        assert_eq!(
            get("daily"),
            Some("weathercode,temperature_2m_max,temperature_2m_min,precipitation_sum,uv_index_max")
        );
    }

    #[test]
    fn past_days_is_not_clamped() {
        let f = OpenMeteoForecast::new(Client::new(), "http://localhost").with_past_days(120);
        let query = f.query(Coordinates::new(0.0, 0.0));
        assert!(query.contains(&("past_days", "120".to_string())));
    }

    #[tokio::test]
    async fn test_get_weather_aggregates_payload() {
        let mock_server = MockServer::start().await;

        // A window around "now" so the current hour is found and the daily
        // forecast is not filtered away.
        let now = Utc::now().naive_utc();
        let start = now.date().and_hms_opt(0, 0, 0).unwrap() - Duration::days(1);
        let times: Vec<String> = (0..72)
            .map(|h| (start + Duration::hours(h)).format("%Y-%m-%dT%H:%M").to_string())
            .collect();
        let current: NaiveDateTime = start + Duration::hours(30);
        let days: Vec<String> = (0..10)
            .map(|d| (start + Duration::days(d)).format("%Y-%m-%d").to_string())
            .collect();

        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "52.52"))
            .and(query_param("longitude", "13.41"))
            .and(query_param("past_days", "90"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "current_weather": {
                    "time": current.format("%Y-%m-%dT%H:%M").to_string(),
                    "temperature": 12.5,
                    "windspeed": 8.0,
                    "weathercode": 2
                },
                "hourly": {
                    "time": times,
                    "temperature_2m": vec![10.0; 72],
                    "relativehumidity_2m": vec![55; 72],
                    "precipitation": vec![0.1; 72],
                    "pressure_msl": vec![1012.0; 72],
                    "weathercode": vec![2; 72]
                },
                "daily": {
                    "time": days,
                    "weathercode": vec![2; 10],
                    "temperature_2m_max": vec![15.0; 10],
                    "temperature_2m_min": vec![5.0; 10],
                    "precipitation_sum": vec![1.0; 10],
                    "uv_index_max": vec![3.0; 10]
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let snapshot = forecast(&mock_server)
            .get_weather(Coordinates::new(52.52, 13.41))
            .await
            .unwrap();

        assert_eq!(snapshot.current.temp, Some(12.5));
        assert_eq!(snapshot.current.humidity, Some(55.0));
        assert_eq!(snapshot.hourly.len(), 24);
        assert_eq!(snapshot.hourly[0].timestamp, times[30]);
        // everything before the fetch date is dropped
        let today = snapshot.fetched_at.date_naive().format("%Y-%m-%d").to_string();
        assert_eq!(snapshot.daily.len(), 7);
        assert_eq!(snapshot.daily[0].date, today);
        assert!(!snapshot.series.is_empty());
    }

    #[tokio::test]
    async fn test_get_weather_tolerates_empty_payload() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&mock_server)
            .await;

        let snapshot = forecast(&mock_server)
            .get_weather(Coordinates::new(0.0, 0.0))
            .await
            .unwrap();
        assert!(snapshot.hourly.is_empty());
        assert!(snapshot.daily.is_empty());
        assert_eq!(snapshot.current.temp, None);
    }

    #[tokio::test]
    async fn test_bad_request_yields_no_snapshot() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": true,
                "reason": "Parameter 'past_days' must be between 0 and 92"
            })))
            .mount(&mock_server)
            .await;

        let err = forecast(&mock_server)
            .with_past_days(120)
            .get_weather(Coordinates::new(0.0, 0.0))
            .await
            .unwrap_err();

        match err {
            FetchError::Status { status, body, .. } => {
                assert_eq!(status, 400);
                assert!(body.contains("past_days"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }
}
