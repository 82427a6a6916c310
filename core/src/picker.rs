//! Headless state of an airport autocomplete field.
//!
//! Keystrokes are debounced into `search_airport` calls. Whatever call
//! resolves last replaces the options, even if it was issued earlier; an
//! in-flight search is never aborted. Failures are logged and leave the
//! current options in place.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::warn;

use crate::debounce::Debouncer;
use crate::error::ApiError;
use crate::http::Transport;
use crate::service::FlightSearch;
use crate::store::KeyValueStore;
use crate::types::{AirportResult, Coordinates, NearbyAirports};

#[derive(Debug, Default)]
struct PickerState {
    options: Vec<AirportResult>,
    loading: bool,
    initial_selection_made: bool,
}

pub struct AirportPicker<S, T> {
    service: Arc<FlightSearch<S, T>>,
    debouncer: Debouncer,
    state: Arc<Mutex<PickerState>>,
}

impl<S, T> AirportPicker<S, T>
where
    S: KeyValueStore + 'static,
    T: Transport + 'static,
{
    pub fn new(service: Arc<FlightSearch<S, T>>) -> Self {
        Self::with_debouncer(service, Debouncer::default())
    }

    pub fn with_delay(service: Arc<FlightSearch<S, T>>, delay: Duration) -> Self {
        Self::with_debouncer(service, Debouncer::new(delay))
    }

    fn with_debouncer(service: Arc<FlightSearch<S, T>>, debouncer: Debouncer) -> Self {
        Self {
            service,
            debouncer,
            state: Arc::new(Mutex::new(PickerState::default())),
        }
    }

    pub fn options(&self) -> Vec<AirportResult> {
        self.state.lock().options.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    /// Whether the suggestion list should be shown for the current input.
    pub fn is_open(&self, input: &str) -> bool {
        !input.trim().is_empty() && !self.is_loading()
    }

    /// Handle a change of the input text. Must be called from within a
    /// tokio runtime.
    pub fn on_input(&self, input: &str) {
        self.state.lock().loading = true;
        let service = Arc::clone(&self.service);
        let state = Arc::clone(&self.state);
        let query = input.to_string();
        self.debouncer.call(async move {
            let result = service.search_airport(&query).await;
            let mut state = state.lock();
            match result {
                Ok(airports) => state.options = airports,
                Err(e) => warn!(query = %query, error = %e, "airport search failed"),
            }
            state.loading = false;
        });
    }

    /// Load airports around the user's position into the options.
    ///
    /// Returns the best-match airport the first time it succeeds, so the
    /// caller can preselect it; later calls only refresh the options.
    pub async fn load_nearby(
        &self,
        coordinates: Coordinates,
    ) -> Result<Option<AirportResult>, ApiError> {
        let NearbyAirports { current, nearby, .. } =
            self.service.get_nearby_airports(coordinates).await?;
        let mut state = self.state.lock();
        state.options = nearby;
        if state.initial_selection_made {
            return Ok(None);
        }
        state.initial_selection_made = true;
        Ok(Some(current))
    }
}
