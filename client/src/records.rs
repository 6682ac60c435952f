//! Record Store: client-side cache of the city collection.
//!
//! Every operation marks the store as loading, awaits the remote, then folds
//! the outcome back in through [`reduce`]. Operations are independent of one
//! another: overlapping calls interleave freely and the last write wins.
//! Failures never escape; they land in `RecordState::error` as a fixed message.

use std::fmt;
use std::sync::Arc;

use domain::{City, NewCity, RecordId};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::remote::CityCollection;

pub const LOAD_ERROR: &str = "There was an error loading data...";
pub const CREATE_ERROR: &str = "There was an error creating the city...";
pub const DELETE_ERROR: &str = "There was an error deleting the city...";
pub const GET_ERROR: &str = "There was an error getting the city...";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RecordState {
    pub cities: Vec<City>,
    pub is_loading: bool,
    /// The selected city; `None` until one has been loaded.
    pub current_city: Option<City>,
    /// Empty when the last completed operation succeeded.
    pub error: String,
}

impl RecordState {
    pub fn is_selected(&self, id: &RecordId) -> bool {
        self.current_city.as_ref().is_some_and(|c| c.id == *id)
    }
}

/// Every transition the Record Store can make.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordAction {
    Loading,
    CitiesLoaded(Vec<City>),
    CityCreated(City),
    CityLoaded(City),
    CityDeleted(RecordId),
    Rejected(String),
}

impl fmt::Display for RecordAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordAction::Loading => "loading",
            RecordAction::CitiesLoaded(_) => "cities/loaded",
            RecordAction::CityCreated(_) => "cities/created",
            RecordAction::CityLoaded(_) => "city/loaded",
            RecordAction::CityDeleted(_) => "cities/deleted",
            RecordAction::Rejected(_) => "rejected",
        };
        f.write_str(name)
    }
}

pub fn reduce(state: &mut RecordState, action: RecordAction) {
    match action {
        RecordAction::Loading => state.is_loading = true,
        RecordAction::CitiesLoaded(cities) => {
            state.is_loading = false;
            state.error.clear();
            state.cities = cities;
        }
        RecordAction::CityCreated(city) => {
            state.is_loading = false;
            state.error.clear();
            state.cities.push(city);
        }
        RecordAction::CityLoaded(city) => {
            state.is_loading = false;
            state.error.clear();
            state.current_city = Some(city);
        }
        RecordAction::CityDeleted(id) => {
            state.is_loading = false;
            state.error.clear();
            state.cities.retain(|c| c.id != id);
            state.current_city = None;
        }
        RecordAction::Rejected(message) => {
            state.is_loading = false;
            state.error = message;
        }
    }
}

/// Handle to a Record Store. Clones share the same state and remote.
pub struct RecordStore<C: CityCollection> {
    remote: Arc<C>,
    state: Arc<watch::Sender<RecordState>>,
}

impl<C: CityCollection> Clone for RecordStore<C> {
    fn clone(&self) -> Self {
        Self {
            remote: Arc::clone(&self.remote),
            state: Arc::clone(&self.state),
        }
    }
}

impl<C: CityCollection> RecordStore<C> {
    pub fn new(remote: C) -> Self {
        let (tx, _rx) = watch::channel(RecordState::default());
        Self {
            remote: Arc::new(remote),
            state: Arc::new(tx),
        }
    }

    /// Build a store and run the initial `fetch_all`.
    pub async fn load(remote: C) -> Self {
        let store = Self::new(remote);
        store.fetch_all().await;
        store
    }

    pub fn snapshot(&self) -> RecordState {
        self.state.borrow().clone()
    }

    /// Receiver notified after every transition.
    pub fn subscribe(&self) -> watch::Receiver<RecordState> {
        self.state.subscribe()
    }

    pub async fn fetch_all(&self) {
        self.dispatch(RecordAction::Loading);
        match self.remote.list().await {
            Ok(cities) => self.dispatch(RecordAction::CitiesLoaded(cities)),
            Err(e) => self.reject(LOAD_ERROR, e),
        }
    }

    pub async fn create(&self, city: NewCity) {
        self.dispatch(RecordAction::Loading);
        match self.remote.create(&city).await {
            Ok(created) => self.dispatch(RecordAction::CityCreated(created)),
            Err(e) => self.reject(CREATE_ERROR, e),
        }
    }

    /// Delete a city. Deleting the selected city is a no-op and sends nothing.
    pub async fn remove(&self, id: &RecordId) {
        if self.state.borrow().is_selected(id) {
            debug!(%id, "refusing to delete the selected city");
            return;
        }
        self.dispatch(RecordAction::Loading);
        match self.remote.delete(id).await {
            Ok(()) => self.dispatch(RecordAction::CityDeleted(id.clone())),
            Err(e) => self.reject(DELETE_ERROR, e),
        }
    }

    pub async fn get_one(&self, id: &RecordId) {
        self.dispatch(RecordAction::Loading);
        match self.remote.get(id).await {
            Ok(city) => self.dispatch(RecordAction::CityLoaded(city)),
            Err(e) => self.reject(GET_ERROR, e),
        }
    }

    fn reject(&self, message: &str, cause: RemoteError) {
        warn!(err = %cause, "{}", message);
        self.dispatch(RecordAction::Rejected(message.to_string()));
    }

    fn dispatch(&self, action: RecordAction) {
        debug!(action = %action, "record store");
        self.state.send_modify(|state| reduce(state, action));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use domain::Position;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    fn city(id: u64, name: &str) -> City {
        City {
            id: RecordId::Number(id),
            city_name: name.to_string(),
            country: "Portugal".to_string(),
            emoji: "🇵🇹".to_string(),
            date: "2027-10-31T15:59:59.138Z".to_string(),
            notes: String::new(),
            position: Position { lat: 38.7, lng: -9.1 },
        }
    }

    fn new_city(name: &str) -> NewCity {
        NewCity {
            city_name: name.to_string(),
            country: "Spain".to_string(),
            emoji: "🇪🇸".to_string(),
            date: "2027-07-15T08:22:53.976Z".to_string(),
            notes: String::new(),
            position: Position { lat: 40.4, lng: -3.7 },
        }
    }

    /// In-memory collection that counts calls and can be told to fail.
    #[derive(Default)]
    struct FakeCollection {
        cities: Mutex<Vec<City>>,
        failing: AtomicBool,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl FakeCollection {
        fn with(cities: Vec<City>) -> Self {
            Self {
                cities: Mutex::new(cities),
                ..Default::default()
            }
        }

        fn begin(&self) -> Result<(), RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(RemoteError::Status(StatusCode::INTERNAL_SERVER_ERROR));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CityCollection for FakeCollection {
        async fn list(&self) -> Result<Vec<City>, RemoteError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.begin()?;
            Ok(self.cities.lock().unwrap().clone())
        }

        async fn get(&self, id: &RecordId) -> Result<City, RemoteError> {
            self.begin()?;
            self.cities
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == *id)
                .cloned()
                .ok_or(RemoteError::Status(StatusCode::NOT_FOUND))
        }

        async fn create(&self, city: &NewCity) -> Result<City, RemoteError> {
            self.begin()?;
            let mut cities = self.cities.lock().unwrap();
            let next = cities.iter().filter_map(|c| c.id.as_number()).max().unwrap_or(0) + 1;
            let created = City {
                id: RecordId::Number(next),
                city_name: city.city_name.clone(),
                country: city.country.clone(),
                emoji: city.emoji.clone(),
                date: city.date.clone(),
                notes: city.notes.clone(),
                position: city.position,
            };
            cities.push(created.clone());
            Ok(created)
        }

        async fn delete(&self, id: &RecordId) -> Result<(), RemoteError> {
            self.begin()?;
            let mut cities = self.cities.lock().unwrap();
            let before = cities.len();
            cities.retain(|c| c.id != *id);
            if cities.len() == before {
                return Err(RemoteError::Status(StatusCode::NOT_FOUND));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn fetch_all_mirrors_the_collection() {
        let seeded = vec![city(1, "Lisbon"), city(2, "Porto")];
        let store = RecordStore::load(FakeCollection::with(seeded.clone())).await;
        let state = store.snapshot();
        assert_eq!(state.cities, seeded);
        assert!(!state.is_loading);
        assert_eq!(state.error, "");
    }

    #[tokio::test]
    async fn fetch_failure_sets_fixed_message() {
        let fake = FakeCollection::with(vec![city(1, "Lisbon")]);
        fake.failing.store(true, Ordering::SeqCst);
        let store = RecordStore::load(fake).await;
        let state = store.snapshot();
        assert_eq!(state.error, LOAD_ERROR);
        assert!(!state.is_loading);
        assert!(state.cities.is_empty());
    }

    #[tokio::test]
    async fn create_appends_server_entity() {
        let store = RecordStore::load(FakeCollection::with(vec![city(1, "Lisbon")])).await;
        store.create(new_city("Madrid")).await;
        let state = store.snapshot();
        assert_eq!(state.cities.len(), 2);
        assert_eq!(state.cities[1].id, RecordId::Number(2));
        assert_eq!(state.cities[1].city_name, "Madrid");
    }

    #[tokio::test]
    async fn create_failure_keeps_cities() {
        let store = RecordStore::load(FakeCollection::with(vec![city(1, "Lisbon")])).await;
        store.remote.failing.store(true, Ordering::SeqCst);
        store.create(new_city("Madrid")).await;
        let state = store.snapshot();
        assert_eq!(state.cities.len(), 1);
        assert_eq!(state.error, CREATE_ERROR);
    }

    #[tokio::test]
    async fn removing_selected_city_is_a_no_op() {
        let store = RecordStore::load(FakeCollection::with(vec![city(1, "Lisbon"), city(2, "Porto")])).await;
        store.get_one(&RecordId::Number(1)).await;
        let before = store.snapshot();
        let calls = store.remote.calls.load(Ordering::SeqCst);

        store.remove(&RecordId::Text("1".into())).await;

        assert_eq!(store.snapshot(), before);
        assert_eq!(store.remote.calls.load(Ordering::SeqCst), calls, "no request issued");
    }

    #[tokio::test]
    async fn removing_other_city_drops_only_that_one() {
        let store = RecordStore::load(FakeCollection::with(vec![
            city(1, "Lisbon"),
            city(2, "Porto"),
            city(3, "Faro"),
        ]))
        .await;
        store.get_one(&RecordId::Number(1)).await;
        store.remove(&RecordId::Number(2)).await;

        let state = store.snapshot();
        let names: Vec<_> = state.cities.iter().map(|c| c.city_name.as_str()).collect();
        assert_eq!(names, ["Lisbon", "Faro"]);
        assert!(state.current_city.is_none());
        assert_eq!(state.error, "");
    }

    #[tokio::test]
    async fn remove_failure_sets_message() {
        let store = RecordStore::load(FakeCollection::with(vec![city(1, "Lisbon")])).await;
        store.remove(&RecordId::Number(9)).await;
        let state = store.snapshot();
        assert_eq!(state.error, DELETE_ERROR);
        assert_eq!(state.cities.len(), 1);
    }

    #[tokio::test]
    async fn get_one_selects_and_reports_missing() {
        let store = RecordStore::load(FakeCollection::with(vec![city(1, "Lisbon")])).await;
        store.get_one(&RecordId::Number(1)).await;
        assert_eq!(
            store.snapshot().current_city.map(|c| c.city_name),
            Some("Lisbon".to_string())
        );

        store.get_one(&RecordId::Number(7)).await;
        let state = store.snapshot();
        assert_eq!(state.error, GET_ERROR);
        // The previous selection survives a failed lookup
        assert!(state.current_city.is_some());
    }

    #[tokio::test]
    async fn later_success_clears_error() {
        let store = RecordStore::load(FakeCollection::with(vec![city(1, "Lisbon")])).await;
        store.get_one(&RecordId::Number(7)).await;
        assert_eq!(store.snapshot().error, GET_ERROR);
        store.fetch_all().await;
        assert_eq!(store.snapshot().error, "");
    }

    #[tokio::test]
    async fn loading_is_visible_while_request_is_in_flight() {
        let gate = Arc::new(Notify::new());
        let fake = FakeCollection {
            cities: Mutex::new(vec![city(1, "Lisbon")]),
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        };
        let store = RecordStore::new(fake);
        let mut rx = store.subscribe();

        let task = tokio::spawn({
            let store = store.clone();
            async move { store.fetch_all().await }
        });

        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_loading);

        gate.notify_one();
        task.await.unwrap();
        let state = store.snapshot();
        assert!(!state.is_loading);
        assert_eq!(state.cities.len(), 1);
    }

    #[test]
    fn reducer_rejection_keeps_data() {
        let mut state = RecordState {
            cities: vec![city(1, "Lisbon")],
            is_loading: true,
            current_city: None,
            error: String::new(),
        };
        reduce(&mut state, RecordAction::Rejected(LOAD_ERROR.into()));
        assert!(!state.is_loading);
        assert_eq!(state.cities.len(), 1);
        assert_eq!(state.error, LOAD_ERROR);
    }
}
