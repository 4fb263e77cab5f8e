//! Wires the panels to the store.
//!
//! The map panel renders synchronously from the location. The weather panel
//! starts a fetch per location change; only the result for the most recent
//! location is delivered, older ones are dropped when they arrive.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::{runtime::Handle, sync::mpsc};

use crate::{
    error::FetchError,
    forecast::WeatherSource,
    map::{MapPanel, MapView},
    model::{Location, WeatherSnapshot},
    store::{AppState, Store, Subscription},
};

#[derive(Debug)]
pub enum PanelUpdate {
    Map(MapView),
    Weather {
        location: Location,
        snapshot: WeatherSnapshot,
    },
    WeatherFailed {
        location: Location,
        error: FetchError,
    },
}

#[derive(Debug)]
pub struct Dashboard {
    subscriptions: Vec<Subscription>,
}

impl Dashboard {
    /// Subscribe both panels to `store`. Updates arrive on the returned
    /// receiver, which closes once the dashboard is detached and every
    /// in-flight fetch has finished.
    ///
    /// Must be called from within a Tokio runtime. Fetches run on that
    /// runtime whichever thread later updates the store.
    pub fn attach(
        store: &Store<AppState>,
        weather: Arc<dyn WeatherSource>,
        map: &MapPanel,
    ) -> (Self, mpsc::UnboundedReceiver<PanelUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let map_tx = tx.clone();
        let map_sub = map.attach(store, move |view| {
            let _ = map_tx.send(PanelUpdate::Map(view));
        });

        let runtime = Handle::current();
        let latest = Arc::new(AtomicU64::new(0));
        let weather_sub = store.subscribe(
            |state: &AppState| state.location.clone(),
            move |location: &Option<Location>| {
                let Some(location) = location.clone() else {
                    return;
                };

                let ticket = latest.fetch_add(1, Ordering::SeqCst) + 1;
                let latest = Arc::clone(&latest);
                let source = Arc::clone(&weather);
                let tx = tx.clone();

                runtime.spawn(async move {
                    let result = source.get_weather(location.coords).await;

                    if latest.load(Ordering::SeqCst) != ticket {
                        tracing::debug!(location = %location.name, "Discarding stale weather result");
                        return;
                    }

                    let update = match result {
                        Ok(snapshot) => PanelUpdate::Weather { location, snapshot },
                        Err(error) => PanelUpdate::WeatherFailed { location, error },
                    };
                    let _ = tx.send(update);
                });
            },
        );

        let dashboard = Self {
            subscriptions: vec![map_sub, weather_sub],
        };
        (dashboard, rx)
    }

    /// Stop reacting to the store. Fetches already started still report.
    pub fn detach(self) {
        for sub in self.subscriptions {
            sub.unsubscribe();
        }
    }
}
