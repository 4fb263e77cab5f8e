//! Explicit application state container.
//!
//! Components receive a [`Store`] handle instead of reaching for global state,
//! and register interest in a slice of it with [`Store::subscribe`].

use std::sync::{
    Arc, Weak,
    atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;

use crate::model::Location;

/// State shared by the dashboard panels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub location: Option<Location>,
}

type Listener<S> = Box<dyn FnMut(&S) + Send>;

struct Inner<S> {
    state: Mutex<S>,
    // Lock order: `listeners` before `state`.
    listeners: Mutex<Vec<(u64, Listener<S>)>>,
    next_id: AtomicU64,
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

impl<S: Send> Detach for Inner<S> {
    fn detach(&self, id: u64) {
        self.listeners.lock().retain(|(lid, _)| *lid != id);
    }
}

/// Cloneable handle to shared state.
///
/// Listeners run synchronously on the thread that changed the state. They must
/// not update the store, subscribe, or drop a [`Subscription`] from inside the
/// callback; hand the work off to a channel instead.
pub struct Store<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only `state` is taken: `listeners` is held for the whole of a notify.
        let state = self.inner.state.lock();
        f.debug_struct("Store")
            .field("state", &*state)
            .finish_non_exhaustive()
    }
}

impl<S: Clone + Send + 'static> Store<S> {
    pub fn new(initial: S) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(initial),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn get(&self) -> S {
        self.inner.state.lock().clone()
    }

    /// Mutate the state and notify listeners whose slice changed.
    pub fn update(&self, f: impl FnOnce(&mut S)) {
        {
            let mut state = self.inner.state.lock();
            f(&mut *state);
        }
        self.notify();
    }

    /// Call `listener` with `selector(state)` now, and again each time the
    /// selected value changes. The listener stays registered until the
    /// returned [`Subscription`] is dropped or unsubscribed.
    pub fn subscribe<T, Sel, L>(&self, selector: Sel, mut listener: L) -> Subscription
    where
        T: PartialEq + Send + 'static,
        Sel: Fn(&S) -> T + Send + 'static,
        L: FnMut(&T) + Send + 'static,
    {
        let mut listeners = self.inner.listeners.lock();

        let mut last = {
            let state = self.inner.state.lock();
            selector(&*state)
        };
        listener(&last);

        let boxed: Listener<S> = Box::new(move |state: &S| {
            let next = selector(state);
            if next != last {
                listener(&next);
                last = next;
            }
        });
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        listeners.push((id, boxed));

        let owner: Weak<dyn Detach> = Arc::downgrade(&self.inner) as Weak<dyn Detach>;
        Subscription {
            id,
            owner: Some(owner),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    fn notify(&self) {
        let mut listeners = self.inner.listeners.lock();
        // Read the state under the listener lock so concurrent updates are
        // delivered in order; a later notify with no change is a no-op.
        let state = self.inner.state.lock().clone();
        for (_, listener) in listeners.iter_mut() {
            listener(&state);
        }
    }
}

impl Store<AppState> {
    pub fn set_location(&self, location: Location) {
        self.update(|s| s.location = Some(location));
    }

    pub fn clear_location(&self) {
        self.update(|s| s.location = None);
    }
}

/// Registration handle returned by [`Store::subscribe`]; dropping it removes
/// the listener.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    owner: Option<Weak<dyn Detach>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.detach();
    }

    fn detach(&mut self) {
        if let Some(owner) = self.owner.take().and_then(|w| w.upgrade()) {
            owner.detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.owner.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Coordinates;

    fn loc(name: &str, lat: f64) -> Location {
        Location {
            name: name.to_string(),
            coords: Coordinates::new(lat, 0.0),
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<Option<String>>>>, impl FnMut(&Option<Location>) + Send) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |l: &Option<Location>| {
            sink.lock().push(l.as_ref().map(|l| l.name.clone()))
        })
    }

    #[test]
    fn listener_gets_current_value_then_changes_only() {
        let store = Store::new(AppState::default());
        let (seen, listener) = recorder();
        let _sub = store.subscribe(|s: &AppState| s.location.clone(), listener);

        store.set_location(loc("Oslo", 59.9));
        store.set_location(loc("Oslo", 59.9));
        store.set_location(loc("Rome", 41.9));
        store.clear_location();

        assert_eq!(
            *seen.lock(),
            vec![
                None,
                Some("Oslo".to_string()),
                Some("Rome".to_string()),
                None
            ]
        );
    }

    #[test]
    fn unrelated_updates_do_not_notify() {
        #[derive(Clone, Default, PartialEq)]
        struct State {
            a: u32,
            b: u32,
        }

        let store = Store::new(State::default());
        let calls = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&calls);
        let _sub = store.subscribe(
            |s: &State| s.a,
            move |_| {
                counter.fetch_add(1, Ordering::Relaxed);
            },
        );

        store.update(|s| s.b += 1);
        store.update(|s| s.b += 1);
        assert_eq!(calls.load(Ordering::Relaxed), 1);

        store.update(|s| s.a += 1);
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let store = Store::new(AppState::default());
        let (seen, listener) = recorder();
        let sub = store.subscribe(|s: &AppState| s.location.clone(), listener);
        assert_eq!(store.listener_count(), 1);

        sub.unsubscribe();
        assert_eq!(store.listener_count(), 0);

        store.set_location(loc("Lima", -12.0));
        assert_eq!(*seen.lock(), vec![None]);
    }

    #[test]
    fn dropping_subscription_detaches() {
        let store = Store::new(AppState::default());
        {
            let (_seen, listener) = recorder();
            let _sub = store.subscribe(|s: &AppState| s.location.clone(), listener);
            assert_eq!(store.listener_count(), 1);
        }
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn subscription_outliving_store_is_harmless() {
        let store = Store::new(AppState::default());
        let (_seen, listener) = recorder();
        let sub = store.subscribe(|s: &AppState| s.location.clone(), listener);
        drop(store);
        sub.unsubscribe();
    }

    #[test]
    fn store_can_be_formatted_from_a_listener() {
        let store = Store::new(AppState::default());
        let handle = store.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        let _sub = store.subscribe(
            |s: &AppState| s.location.clone(),
            move |_| {
                let _ = tx.send(format!("{handle:?}"));
            },
        );

        store.set_location(loc("Nairobi", -1.3));

        let printed: Vec<String> = rx.try_iter().collect();
        assert_eq!(printed.len(), 2);
        assert!(printed[1].contains("Nairobi"));
    }

    #[test]
    fn clones_share_state() {
        let store = Store::new(AppState::default());
        let other = store.clone();
        other.set_location(loc("Quito", -0.2));
        assert_eq!(store.get().location.map(|l| l.name), Some("Quito".to_string()));
    }
}
