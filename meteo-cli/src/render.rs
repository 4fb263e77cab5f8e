//! Plain-text rendering of the dashboard panels.

use std::fmt::Write;

use meteo_core::{Condition, MapView, Place, WeatherSnapshot};

const MISSING: &str = "-";

pub fn places(places: &[Place]) -> String {
    let mut out = String::new();
    for (i, place) in places.iter().enumerate() {
        let _ = writeln!(out, "{:>2}. {place}", i + 1);
    }
    out
}

pub fn weather(name: &str, snapshot: &WeatherSnapshot) -> String {
    let mut out = String::new();
    let current = &snapshot.current;

    let _ = writeln!(out, "{name}");
    let _ = writeln!(
        out,
        "  Now: {}  {}  wind {}  humidity {}",
        with_unit(current.temp, "°C"),
        condition(current.code),
        with_unit(current.wind, " km/h"),
        with_unit(current.humidity, "%"),
    );

    if !snapshot.hourly.is_empty() {
        let _ = writeln!(out, "\nNext {} hours", snapshot.hourly.len());
        for h in &snapshot.hourly {
            let _ = writeln!(
                out,
                "  {:<5} {:>8} {:>6} {:>8} {:>10}  {}",
                time_of_day(&h.timestamp),
                with_unit(h.temp, "°C"),
                with_unit(h.humidity, "%"),
                with_unit(h.precip, " mm"),
                with_unit(h.pressure, " hPa"),
                condition(h.code),
            );
        }
    }

    if !snapshot.daily.is_empty() {
        let _ = writeln!(out, "\nDaily");
        for d in &snapshot.daily {
            let _ = writeln!(
                out,
                "  {}  {:>8} / {:<8} {:>7.1} mm  UV {:<4.1} {}",
                d.date,
                with_unit(d.min, "°C"),
                with_unit(d.max, "°C"),
                d.precip,
                d.uv_index_max,
                condition(d.code),
            );
        }
    }

    let series = &snapshot.series;
    if !series.is_empty() {
        let _ = writeln!(out, "\nMonthly");
        let _ = writeln!(
            out,
            "  {:<8} {:>8} {:>9} {:>8} {:>4}",
            "month", "humidity", "pressure", "rain", "uv"
        );
        for i in 0..series.len() {
            let _ = writeln!(
                out,
                "  {:<8} {:>8} {:>9} {:>8} {:>4}",
                series.months[i],
                int_with_unit(series.humidity[i], "%"),
                int_with_unit(series.pressure[i], ""),
                format!("{} mm", series.rain[i]),
                series.uv[i],
            );
        }
    }

    let _ = writeln!(out, "\nFetched {}", snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC"));
    out
}

pub fn map(view: &MapView) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Map of {} ({}x{})",
        view.location.name, view.width, view.height
    );
    let _ = writeln!(out, "  image:    {}", view.image_url);
    let _ = writeln!(out, "  fallback: {}", view.fallback_image_url);
    let _ = writeln!(out, "  open:     {}", view.link_url);
    out
}

fn with_unit(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.1}{unit}"),
        None => MISSING.to_string(),
    }
}

fn int_with_unit(value: Option<i64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v}{unit}"),
        None => MISSING.to_string(),
    }
}

fn condition(code: Option<i32>) -> &'static str {
    code.map_or(MISSING, |c| Condition::from_wmo_code(c).description())
}

/// "HH:MM" part of an ISO timestamp.
fn time_of_day(ts: &str) -> &str {
    ts.split_once('T').map_or(ts, |(_, time)| time)
}
