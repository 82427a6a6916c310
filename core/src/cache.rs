//! Response cache over a `KeyValueStore`.
//!
//! # Design
//! Entries are upstream response bodies, byte for byte as received, under
//! `<prefix><key>`. There is no expiry and no eviction: an entry lives until
//! a later successful response overwrites it or `clear` sweeps the prefix.
//! Only envelopes whose `status` is truthy are written.
//!
//! A cache read never fails the caller. A store error or an entry that no
//! longer deserializes is logged and reported as a miss, so the request
//! falls through to the network.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::FlightSearchRoute;
use crate::error::ApiError;
use crate::store::KeyValueStore;
use crate::types::{is_truthy, ApiResponse, Coordinates};
use crate::validate::SearchFlightsParams;

/// A stored upstream envelope and the key it was found under.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse<T> {
    pub key: String,
    pub response: ApiResponse<T>,
}

pub struct ResponseCache<S> {
    store: S,
    prefix: String,
}

impl<S: KeyValueStore> ResponseCache<S> {
    pub fn new(store: S, prefix: &str) -> Self {
        Self {
            store,
            prefix: prefix.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn store_ref(&self) -> &S {
        &self.store
    }

    /// Key as written to the underlying store.
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    pub fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<CachedResponse<T>> {
        let storage_key = self.storage_key(key);
        let raw = match self.store.get(&storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key = %storage_key, "cache miss");
                return None;
            }
            Err(e) => {
                warn!(key = %storage_key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(response) => {
                debug!(key = %storage_key, "cache hit");
                Some(CachedResponse {
                    key: storage_key,
                    response,
                })
            }
            Err(e) => {
                warn!(key = %storage_key, error = %e, "corrupt cache entry, treating as miss");
                None
            }
        }
    }

    /// Write the upstream `body` under `key`, unchanged, if its `status` is
    /// truthy. Returns whether anything was written.
    pub fn store(&self, key: &str, body: &str) -> Result<bool, ApiError> {
        let storage_key = self.storage_key(key);
        let succeeded = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|envelope| envelope.get("status").map(is_truthy))
            .unwrap_or(false);
        if !succeeded {
            debug!(key = %storage_key, "not caching unsuccessful response");
            return Ok(false);
        }
        self.store.set(&storage_key, body)?;
        debug!(key = %storage_key, "cached response");
        Ok(true)
    }

    /// Remove every entry under this cache's prefix. Returns the number of
    /// entries removed.
    pub fn clear(&self) -> Result<usize, ApiError> {
        let mut removed = 0;
        for key in self.store.keys()? {
            if key.starts_with(&self.prefix) {
                self.store.remove(&key)?;
                removed += 1;
            }
        }
        debug!(prefix = %self.prefix, removed, "cleared cache");
        Ok(removed)
    }
}

/// Cache key of an airport search: the query text, untouched.
pub fn airport_query_key(query: &str) -> String {
    query.to_string()
}

/// Cache key of a nearby-airports lookup: longitude and latitude each rounded
/// to two decimals, so positions within roughly a kilometre share an entry.
pub fn coordinates_key(coordinates: Coordinates) -> String {
    format!("{:.2},{:.2}", coordinates.longitude, coordinates.latitude)
}

/// Cache key of a flight search: the route path and its normalized query.
pub fn flight_search_key(params: &SearchFlightsParams, route: FlightSearchRoute) -> String {
    let query = params
        .to_query(route)
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}?{query}", route.path())
}
