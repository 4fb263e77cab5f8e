use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use meteo_core::{
    AppState, Config, Coordinates, Dashboard, Geocoder, Location, MapPanel, OpenMeteoForecast,
    OpenMeteoGeocoder, PanelUpdate, Place, Store, WeatherSource, http,
};
use tokio_util::sync::CancellationToken;

use crate::{configure, render};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteo", version, about = "Weather dashboard")]
pub struct Cli {
    /// Verbose logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List places matching a name.
    Search {
        /// Place name, e.g. "Lisbon".
        query: String,
    },

    /// Find a place and show its weather and map.
    Show {
        /// Place name, e.g. "Lisbon".
        query: String,

        /// Take the N-th candidate (1-based) instead of asking.
        #[arg(long)]
        pick: Option<usize>,

        /// Print the weather snapshot as JSON.
        #[arg(long)]
        json: bool,

        /// Save the static map image to this file.
        #[arg(long)]
        map_out: Option<PathBuf>,

        /// Open the interactive map in the browser.
        #[arg(long)]
        open_map: bool,
    },

    /// Show weather for raw coordinates.
    Weather {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Print the weather snapshot as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the map panel for raw coordinates.
    Map {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,

        #[arg(long, allow_negative_numbers = true)]
        lon: f64,

        /// Save the static map image to this file.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Open the interactive map in the browser.
        #[arg(long)]
        open: bool,
    },

    /// Edit settings interactively.
    Configure,
}

/// Clients built from one shared HTTP client.
struct Services {
    geocoder: OpenMeteoGeocoder,
    forecast: OpenMeteoForecast,
    map: MapPanel,
}

impl Services {
    fn from_config(config: &Config) -> Result<Self> {
        let http = http::build_client(config.http_timeout())?;
        Ok(Self {
            geocoder: OpenMeteoGeocoder::from_config(http.clone(), config),
            forecast: OpenMeteoForecast::from_config(http.clone(), config),
            map: MapPanel::from_config(http, config),
        })
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            // An invalid file must stay editable.
            Command::Configure => configure::run(Config::load_unvalidated()?),
            command => {
                let config = Config::load()?;
                let services = Services::from_config(&config)?;
                execute(command, &services).await
            }
        }
    }
}

async fn execute(command: Command, services: &Services) -> Result<()> {
    match command {
        Command::Search { query } => {
            let places = geocode(&services.geocoder, &query).await?;
            if places.is_empty() {
                println!("No places found for '{query}'.");
            } else {
                print!("{}", render::places(&places));
            }
        }
        Command::Show {
            query,
            pick,
            json,
            map_out,
            open_map,
        } => {
            let places = geocode(&services.geocoder, &query).await?;
            let place = choose(&query, places, pick)?;
            tracing::info!(place = %place, "Selected place");
            let opts = MapOptions {
                out: map_out,
                open: open_map,
                quiet: json,
            };
            show(services, Location::from(place), json, &opts).await?;
        }
        Command::Weather { lat, lon, json } => {
            let location = coordinates_location(lat, lon);
            let snapshot = services
                .forecast
                .get_weather(location.coords)
                .await
                .with_context(|| format!("Failed to fetch weather for {}", location.name))?;
            print_weather(&location, &snapshot, json)?;
        }
        Command::Map { lat, lon, out, open } => {
            let location = coordinates_location(lat, lon);
            let opts = MapOptions {
                out,
                open,
                quiet: false,
            };
            handle_map(&services.map, services.map.view(&location), &opts).await?;
        }
        Command::Configure => bail!("`configure` does not use the weather services."),
    }

    Ok(())
}

/// Geocode `query`; Ctrl-C cancels the request.
async fn geocode(geocoder: &OpenMeteoGeocoder, query: &str) -> Result<Vec<Place>> {
    let token = CancellationToken::new();

    let guard = token.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            guard.cancel();
        }
    });

    let result = geocoder.geocode(Some(query), &token).await;
    ctrl_c.abort();

    result.with_context(|| format!("Failed to look up '{query}'"))
}

fn choose(query: &str, mut places: Vec<Place>, pick: Option<usize>) -> Result<Place> {
    if places.is_empty() {
        bail!("No places found for '{query}'.");
    }

    match pick {
        Some(n) => {
            let count = places.len();
            n.checked_sub(1)
                .and_then(|i| places.into_iter().nth(i))
                .ok_or_else(|| anyhow!("--pick {n} is out of range; found {count} place(s)."))
        }
        None if places.len() == 1 => Ok(places.remove(0)),
        None => inquire::Select::new("Which place?", places)
            .prompt()
            .context("No place selected"),
    }
}

struct MapOptions {
    out: Option<PathBuf>,
    open: bool,
    quiet: bool,
}

/// Push the location into the store and render whatever the panels report.
async fn show(services: &Services, location: Location, json: bool, opts: &MapOptions) -> Result<()> {
    let store = Store::new(AppState::default());
    let source: Arc<dyn WeatherSource> = Arc::new(services.forecast.clone());
    let (dashboard, mut updates) = Dashboard::attach(&store, source, &services.map);

    store.set_location(location);
    dashboard.detach();

    while let Some(update) = updates.recv().await {
        match update {
            PanelUpdate::Map(view) => handle_map(&services.map, view, opts).await?,
            PanelUpdate::Weather { location, snapshot } => {
                print_weather(&location, &snapshot, json)?
            }
            PanelUpdate::WeatherFailed { location, error } => {
                return Err(anyhow::Error::new(error)
                    .context(format!("Failed to fetch weather for {}", location.name)));
            }
        }
    }

    Ok(())
}

async fn handle_map(panel: &MapPanel, view: meteo_core::MapView, opts: &MapOptions) -> Result<()> {
    if !opts.quiet {
        print!("{}", render::map(&view));
    }

    if let Some(path) = &opts.out {
        let image = panel
            .load_image(view.location.coords)
            .await
            .context("Failed to download the map image")?;
        tokio::fs::write(path, &image.bytes)
            .await
            .with_context(|| format!("Failed to write map image: {}", path.display()))?;
        eprintln!("Map image (zoom {}) saved to {}", image.zoom, path.display());
    }

    if opts.open {
        webbrowser::open(&view.link_url)
            .with_context(|| format!("Failed to open {}", view.link_url))?;
    }

    Ok(())
}

fn print_weather(
    location: &Location,
    snapshot: &meteo_core::WeatherSnapshot,
    json: bool,
) -> Result<()> {
    if json {
        let doc = serde_json::json!({ "location": location, "weather": snapshot });
        let out = serde_json::to_string_pretty(&doc).context("Failed to serialize weather")?;
        println!("{out}");
    } else {
        print!("{}", render::weather(&location.name, snapshot));
    }
    Ok(())
}

fn coordinates_location(lat: f64, lon: f64) -> Location {
    let coords = Coordinates::new(lat, lon);
    Location {
        name: coords.to_string(),
        coords,
    }
}
