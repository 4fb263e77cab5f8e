use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lat, self.lon)
    }
}

/// A geocoding candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub lat: f64,
    pub lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl Place {
    pub fn coords(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lon)
    }

    /// "Name, Country", or just the name when the country is unknown.
    pub fn label(&self) -> String {
        match &self.country {
            Some(country) => format!("{}, {}", self.name, country),
            None => self.name.clone(),
        }
    }
}

impl std::fmt::Display for Place {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:.4}, {:.4})", self.label(), self.lat, self.lon)?;
        if let Some(tz) = &self.timezone {
            write!(f, " [{tz}]")?;
        }
        Ok(())
    }
}

/// What survives of a [`Place`] once the user picked it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub coords: Coordinates,
}

impl From<Place> for Location {
    fn from(place: Place) -> Self {
        let coords = place.coords();
        Self { name: place.name, coords }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp: Option<f64>,
    pub wind: Option<f64>,
    pub code: Option<i32>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySample {
    pub timestamp: String,
    pub temp: Option<f64>,
    pub humidity: Option<f64>,
    pub precip: Option<f64>,
    pub pressure: Option<f64>,
    pub code: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySample {
    pub date: String,
    pub max: Option<f64>,
    pub min: Option<f64>,
    pub code: Option<i32>,
    pub precip: f64,
    pub uv_index_max: f64,
}

/// Per-month statistics; every vector is parallel to `months`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeries {
    pub months: Vec<String>,
    pub humidity: Vec<Option<i64>>,
    pub pressure: Vec<Option<i64>>,
    pub rain: Vec<i64>,
    pub uv: Vec<i64>,
}

impl MonthlySeries {
    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}

/// Result of one fetch-and-aggregate pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub current: CurrentConditions,
    pub hourly: Vec<HourlySample>,
    pub daily: Vec<DailySample>,
    pub series: MonthlySeries,
    pub fetched_at: DateTime<Utc>,
}
