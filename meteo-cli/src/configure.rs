//! Interactive editing of the config file.

use anyhow::{Context, Result};
use inquire::{CustomType, Text, validator::Validation};
use meteo_core::{Config, config::MAX_PAST_DAYS};

pub fn run(mut config: Config) -> Result<()> {
    let path = Config::config_file_path()?;
    println!("Editing {}", path.display());

    config.past_days = CustomType::<u8>::new("Days of history for monthly statistics:")
        .with_default(config.past_days)
        .with_validator(|days: &u8| {
            Ok(if *days <= MAX_PAST_DAYS {
                Validation::Valid
            } else {
                Validation::Invalid(format!("The forecast API allows at most {MAX_PAST_DAYS}.").into())
            })
        })
        .prompt()
        .context("Configuration aborted")?;

    config.http_timeout_secs = CustomType::<u64>::new("HTTP timeout (seconds):")
        .with_default(config.http_timeout_secs)
        .prompt()
        .context("Configuration aborted")?;

    config.map.zoom = CustomType::<u8>::new("Map zoom:")
        .with_default(config.map.zoom.max(1))
        .with_validator(|zoom: &u8| {
            Ok(if *zoom >= 1 {
                Validation::Valid
            } else {
                Validation::Invalid("The zoom needs room for a lower fallback zoom.".into())
            })
        })
        .prompt()
        .context("Configuration aborted")?;

    let zoom = config.map.zoom;
    config.map.fallback_zoom = CustomType::<u8>::new("Map zoom when the image fails to load:")
        .with_default(fallback_zoom_default(config.map.fallback_zoom, zoom))
        .with_validator(move |fallback: &u8| {
            Ok(if *fallback < zoom {
                Validation::Valid
            } else {
                Validation::Invalid(format!("Must be lower than the map zoom ({zoom}).").into())
            })
        })
        .prompt()
        .context("Configuration aborted")?;

    let forecast = Text::new("Forecast endpoint:")
        .with_default(&config.endpoints.forecast)
        .prompt()
        .context("Configuration aborted")?;
    config.endpoints.forecast = forecast;

    let geocoding = Text::new("Geocoding endpoint:")
        .with_default(&config.endpoints.geocoding)
        .prompt()
        .context("Configuration aborted")?;
    config.endpoints.geocoding = geocoding;

    config.validate()?;
    config.save()?;

    println!("Saved {}", path.display());
    Ok(())
}

/// The saved fallback zoom, unless it no longer sits below `zoom`.
fn fallback_zoom_default(saved: u8, zoom: u8) -> u8 {
    if saved < zoom { saved } else { zoom.saturating_sub(1) }
}
