//! Reshapes a raw forecast payload into the dashboard's views.
//!
//! Everything here is pure: the caller supplies "today" and the fetch time, so
//! the same payload always produces the same snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};

use crate::model::{
    CurrentConditions, DailySample, HourlySample, MonthlySeries, WeatherSnapshot,
};
use crate::raw::{RawCurrentWeather, RawDaily, RawForecast, RawHourly};

pub const HOURLY_WINDOW: usize = 24;
pub const DAILY_WINDOW: usize = 7;
pub const MONTHLY_WINDOW: usize = 12;

pub fn build_snapshot(
    raw: &RawForecast,
    today: NaiveDate,
    fetched_at: DateTime<Utc>,
) -> WeatherSnapshot {
    let current_weather = raw.current_weather.as_ref();
    let idx = current_index(
        &raw.hourly.time,
        current_weather.and_then(|c| c.time.as_deref()),
    );

    let hourly = hourly_window(&raw.hourly, idx);
    let current = current_conditions(current_weather, &raw.hourly, idx);

    let all_days = daily_samples(&raw.daily);
    let today = today.format("%Y-%m-%d").to_string();
    let daily = daily_window(&all_days, &today);

    let series = monthly_series(&raw.hourly, &all_days);

    WeatherSnapshot {
        current,
        hourly,
        daily,
        series,
        fetched_at,
    }
}

/// Position of the API's "now" in the hourly time axis, or 0 when it is
/// missing or does not appear there.
pub fn current_index(times: &[String], current: Option<&str>) -> usize {
    current
        .and_then(|now| times.iter().position(|t| t == now))
        .unwrap_or(0)
}

pub fn hourly_window(hourly: &RawHourly, idx: usize) -> Vec<HourlySample> {
    let end = idx.saturating_add(HOURLY_WINDOW).min(hourly.time.len());

    (idx..end)
        .map(|i| HourlySample {
            timestamp: hourly.time[i].clone(),
            temp: at(&hourly.temperature_2m, i),
            humidity: at(&hourly.relativehumidity_2m, i),
            precip: at(&hourly.precipitation, i),
            pressure: at(&hourly.pressure_msl, i),
            code: at(&hourly.weathercode, i),
        })
        .collect()
}

pub fn current_conditions(
    current: Option<&RawCurrentWeather>,
    hourly: &RawHourly,
    idx: usize,
) -> CurrentConditions {
    CurrentConditions {
        temp: current.and_then(|c| c.temperature),
        wind: current.and_then(|c| c.windspeed),
        code: current.and_then(|c| c.weathercode),
        humidity: finite(at(&hourly.relativehumidity_2m, idx)),
    }
}

/// Positional mapping of the daily arrays; missing precipitation and UV
/// become 0.
pub fn daily_samples(daily: &RawDaily) -> Vec<DailySample> {
    daily
        .time
        .iter()
        .enumerate()
        .map(|(i, date)| DailySample {
            date: date.clone(),
            max: at(&daily.temperature_2m_max, i),
            min: at(&daily.temperature_2m_min, i),
            code: at(&daily.weathercode, i),
            precip: at(&daily.precipitation_sum, i).unwrap_or(0.0),
            uv_index_max: at(&daily.uv_index_max, i).unwrap_or(0.0),
        })
        .collect()
}

/// Days from `today` on (ISO dates compare correctly as strings), at most
/// [`DAILY_WINDOW`] of them, in source order.
pub fn daily_window(days: &[DailySample], today: &str) -> Vec<DailySample> {
    days.iter()
        .filter(|d| d.date.as_str() >= today)
        .take(DAILY_WINDOW)
        .cloned()
        .collect()
}

#[derive(Debug, Default)]
struct Bucket {
    humidity: Vec<f64>,
    pressure: Vec<f64>,
    rain: f64,
    uv_max: f64,
}

pub fn monthly_series(hourly: &RawHourly, days: &[DailySample]) -> MonthlySeries {
    let mut buckets: BTreeMap<&str, Bucket> = BTreeMap::new();

    for (i, ts) in hourly.time.iter().enumerate() {
        let bucket = buckets.entry(month_key(ts)).or_default();
        if let Some(h) = finite(at(&hourly.relativehumidity_2m, i)) {
            bucket.humidity.push(h);
        }
        if let Some(p) = finite(at(&hourly.pressure_msl, i)) {
            bucket.pressure.push(p);
        }
        if let Some(r) = finite(at(&hourly.precipitation, i)) {
            bucket.rain += r;
        }
    }

    // UV only exists as a daily maximum
    for day in days {
        let bucket = buckets.entry(month_key(&day.date)).or_default();
        bucket.uv_max = bucket.uv_max.max(day.uv_index_max);
    }

    let skip = buckets.len().saturating_sub(MONTHLY_WINDOW);
    let mut series = MonthlySeries::default();

    for (month, bucket) in buckets.into_iter().skip(skip) {
        series.months.push(month.to_string());
        series.humidity.push(average(&bucket.humidity));
        series.pressure.push(average(&bucket.pressure));
        series.rain.push(round_half_up(bucket.rain));
        series.uv.push(round_half_up(bucket.uv_max));
    }

    series
}

/// "YYYY-MM" prefix of an ISO timestamp or date.
fn month_key(ts: &str) -> &str {
    match ts.char_indices().nth(7) {
        Some((end, _)) => &ts[..end],
        None => ts,
    }
}

fn at<T: Copy>(values: &[Option<T>], i: usize) -> Option<T> {
    values.get(i).copied().flatten()
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn average(values: &[f64]) -> Option<i64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    Some(round_half_up(sum / values.len() as f64))
}

// Halves round towards +inf, so -2.5 becomes -2.
fn round_half_up(value: f64) -> i64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor as i64 + 1
    } else {
        floor as i64
    }
}
