//! Static map image and interactive map link for the selected location.
//!
//! The pin is drawn by the view at the image center, so the only thing the
//! image service needs is the center coordinate.

use reqwest::Client;

use crate::{
    Config,
    config::MapSettings,
    error::FetchError,
    http,
    model::{Coordinates, Location},
    store::{AppState, Store, Subscription},
};

/// Everything a view needs to draw the panel for one location.
#[derive(Debug, Clone, PartialEq)]
pub struct MapView {
    pub location: Location,
    pub image_url: String,
    pub fallback_image_url: String,
    pub link_url: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct MapImage {
    pub url: String,
    pub zoom: u8,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct MapPanel {
    http: Client,
    static_map_url: String,
    interactive_map_url: String,
    settings: MapSettings,
}

impl MapPanel {
    pub fn new(
        http: Client,
        static_map_url: impl Into<String>,
        interactive_map_url: impl Into<String>,
        settings: MapSettings,
    ) -> Self {
        Self {
            http,
            static_map_url: static_map_url.into(),
            interactive_map_url: interactive_map_url.into(),
            settings,
        }
    }

    pub fn from_config(http: Client, config: &Config) -> Self {
        Self::new(
            http,
            config.endpoints.static_map.clone(),
            config.endpoints.interactive_map.clone(),
            config.map,
        )
    }

    pub fn static_map_url(&self, coords: Coordinates, zoom: u8) -> String {
        format!(
            "{}?center={},{}&zoom={}&size={}x{}",
            self.static_map_url,
            coords.lat,
            coords.lon,
            zoom,
            self.settings.width,
            self.settings.height
        )
    }

    pub fn interactive_map_url(&self, coords: Coordinates) -> String {
        format!(
            "{}/#map={}/{}/{}",
            self.interactive_map_url.trim_end_matches('/'),
            self.settings.link_zoom,
            coords.lat,
            coords.lon
        )
    }

    pub fn view(&self, location: &Location) -> MapView {
        MapView {
            location: location.clone(),
            image_url: self.static_map_url(location.coords, self.settings.zoom),
            fallback_image_url: self.static_map_url(location.coords, self.settings.fallback_zoom),
            link_url: self.interactive_map_url(location.coords),
            width: self.settings.width,
            height: self.settings.height,
        }
    }

    /// Download the map image; a failure at the primary zoom is retried once
    /// at the fallback zoom.
    pub async fn load_image(&self, coords: Coordinates) -> Result<MapImage, FetchError> {
        let zoom = self.settings.zoom;
        let url = self.static_map_url(coords, zoom);

        match http::get_bytes(&self.http, &url).await {
            Ok((content_type, bytes)) => Ok(MapImage {
                url,
                zoom,
                content_type,
                bytes,
            }),
            Err(err) => {
                let zoom = self.settings.fallback_zoom;
                tracing::warn!(error = %err, zoom, "Map image failed, retrying at lower zoom");

                let url = self.static_map_url(coords, zoom);
                let (content_type, bytes) = http::get_bytes(&self.http, &url).await?;
                Ok(MapImage {
                    url,
                    zoom,
                    content_type,
                    bytes,
                })
            }
        }
    }

    /// Re-render through `render` whenever the selected location changes.
    pub fn attach<F>(&self, store: &Store<AppState>, mut render: F) -> Subscription
    where
        F: FnMut(MapView) + Send + 'static,
    {
        let panel = self.clone();
        store.subscribe(
            |state: &AppState| state.location.clone(),
            move |location: &Option<Location>| {
                if let Some(location) = location {
                    render(panel.view(location));
                }
            },
        )
    }
}
