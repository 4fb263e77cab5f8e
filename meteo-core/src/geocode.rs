//! Forward geocoding: place name to candidate coordinates.
//! Uses the Open-Meteo geocoding API - free, no API key required.

use std::fmt::Debug;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::{Config, error::FetchError, http, model::Place};

/// Number of candidates requested per search.
pub const RESULT_COUNT: usize = 5;
const LANGUAGE: &str = "en";

#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// Candidates for `query`. An absent or empty query yields no candidates
    /// and makes no request.
    async fn geocode(
        &self,
        query: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Place>, FetchError>;
}

#[derive(Debug, Clone)]
pub struct OpenMeteoGeocoder {
    http: Client,
    base_url: String,
}

impl OpenMeteoGeocoder {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub fn from_config(http: Client, config: &Config) -> Self {
        Self::new(http, config.endpoints.geocoding.clone())
    }
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    results: Option<Vec<GeoResult>>,
}

#[derive(Debug, Deserialize)]
struct GeoResult {
    name: String,
    country: Option<String>,
    latitude: f64,
    longitude: f64,
    timezone: Option<String>,
}

impl From<GeoResult> for Place {
    fn from(r: GeoResult) -> Self {
        Place {
            name: r.name,
            country: r.country,
            lat: r.latitude,
            lon: r.longitude,
            timezone: r.timezone,
        }
    }
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    async fn geocode(
        &self,
        query: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Place>, FetchError> {
        let Some(query) = query.filter(|q| !q.is_empty()) else {
            return Ok(Vec::new());
        };

        let params = [
            ("name", query.to_string()),
            ("count", RESULT_COUNT.to_string()),
            ("language", LANGUAGE.to_string()),
        ];

        let body: GeoResponse =
            http::get_json(&self.http, &self.base_url, &params, Some(cancel)).await?;

        let places: Vec<Place> = body
            .results
            .unwrap_or_default()
            .into_iter()
            .map(Place::from)
            .collect();

        tracing::info!(query, candidates = places.len(), "Geocoded");
        Ok(places)
    }
}
