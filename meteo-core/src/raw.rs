//! Wire shape of the Open-Meteo forecast payload.
//!
//! Everything is optional: absent sections, absent arrays and explicit
//! `null`s all collapse to empty values instead of failing the parse.

use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawForecast {
    #[serde(default)]
    pub current_weather: Option<RawCurrentWeather>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hourly: RawHourly,
    #[serde(default, deserialize_with = "null_as_default")]
    pub daily: RawDaily,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCurrentWeather {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub windspeed: Option<f64>,
    #[serde(default)]
    pub weathercode: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHourly {
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relativehumidity_2m: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub precipitation: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pressure_msl: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub weathercode: Vec<Option<i32>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDaily {
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub weathercode: Vec<Option<i32>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub temperature_2m_max: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub temperature_2m_min: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub precipitation_sum: Vec<Option<f64>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uv_index_max: Vec<Option<f64>>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_parses_to_empty_forecast() {
        let raw: RawForecast = serde_json::from_str("{}").expect("empty payload is valid");
        assert!(raw.current_weather.is_none());
        assert!(raw.hourly.time.is_empty());
        assert!(raw.daily.time.is_empty());
    }

    #[test]
    fn null_sections_and_elements_are_tolerated() {
        let raw: RawForecast = serde_json::from_str(
            r#"{
                "current_weather": {"time": "2024-01-01T10:00", "temperature": 3.5},
                "hourly": {"time": ["2024-01-01T10:00"], "relativehumidity_2m": [null], "pressure_msl": null},
                "daily": null
            }"#,
        )
        .expect("lenient parse");

        let current = raw.current_weather.expect("current block present");
        assert_eq!(current.temperature, Some(3.5));
        assert_eq!(current.windspeed, None);
        assert_eq!(raw.hourly.relativehumidity_2m, vec![None]);
        assert!(raw.hourly.pressure_msl.is_empty());
        assert!(raw.daily.time.is_empty());
    }

    #[test]
    fn wrong_shape_is_an_error() {
        let res = serde_json::from_str::<RawForecast>(r#"{"hourly": {"time": 5}}"#);
        assert!(res.is_err());
    }
}
