//! API access layer for a flight-search front end backed by the Sky Scrapper
//! flight-data API.
//!
//! # Overview
//! Three upstream operations: airport search by text, nearby airports by
//! coordinates, and flight search by itinerary. Airport lookups are memoized
//! in a local key-value store with no expiry; flight-search parameters are
//! validated before anything is sent.
//!
//! # Design
//! - `SkyScrapperClient` is I/O free: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`.
//! - `FlightSearch` composes the client with a `Transport` and a
//!   `ResponseCache` over any `KeyValueStore`.
//! - `AirportPicker` models the autocomplete field: debounced input, nearby
//!   preselection, last-resolve-wins options.

pub mod cache;
pub mod client;
pub mod config;
pub mod debounce;
pub mod error;
pub mod http;
pub mod picker;
pub mod service;
pub mod store;
pub mod types;
pub mod validate;

pub use cache::{CachedResponse, ResponseCache};
pub use client::SkyScrapperClient;
pub use config::{ClientConfig, FlightSearchRoute};
pub use debounce::Debouncer;
pub use error::{ApiError, FieldIssue, ValidationError};
pub use http::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use picker::AirportPicker;
pub use service::FlightSearch;
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use types::{
    AirportResult, ApiResponse, CabinClass, Coordinates, FlightSearchData, NearbyAirports,
    SearchFlightOptions,
};
pub use validate::{search_flights_params, SearchFlightsParams};
