//! Core library for the `meteo` weather dashboard.
//!
//! This crate defines:
//! - Configuration handling
//! - Geocoding and forecast clients for the Open-Meteo APIs
//! - Aggregation of the raw forecast into dashboard views
//! - The map panel and the state store the panels subscribe to
//!
//! It is used by `meteo-cli`, but can also be reused by other front ends.

pub mod aggregate;
pub mod condition;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod forecast;
pub mod geocode;
pub mod http;
pub mod map;
pub mod model;
pub mod raw;
pub mod store;

pub use condition::Condition;
pub use config::{Config, Endpoints, MapSettings};
pub use dashboard::{Dashboard, PanelUpdate};
pub use error::FetchError;
pub use forecast::{OpenMeteoForecast, WeatherSource};
pub use geocode::{Geocoder, OpenMeteoGeocoder};
pub use map::{MapImage, MapPanel, MapView};
pub use model::{
    Coordinates, CurrentConditions, DailySample, HourlySample, Location, MonthlySeries, Place,
    WeatherSnapshot,
};
pub use store::{AppState, Store, Subscription};
