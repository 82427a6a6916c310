//! Client configuration loaded from the environment.
//!
//! Credentials are never validated here: a missing base URL or key is logged
//! and left empty, so every call fails later at the transport layer rather
//! than at startup.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{info, warn};

use crate::error::ApiError;

pub const DEFAULT_CACHE_PREFIX: &str = "skyscrapper:";

/// Which flight-search endpoint the upstream exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlightSearchRoute {
    /// `GET /search` with `departDate`.
    #[default]
    Search,
    /// `GET /searchFlights` with `date`.
    SearchFlights,
}

impl FlightSearchRoute {
    pub fn path(&self) -> &'static str {
        match self {
            FlightSearchRoute::Search => "/search",
            FlightSearchRoute::SearchFlights => "/searchFlights",
        }
    }

    /// Name of the departure-date query parameter.
    pub fn date_param(&self) -> &'static str {
        match self {
            FlightSearchRoute::Search => "departDate",
            FlightSearchRoute::SearchFlights => "date",
        }
    }
}

impl FromStr for FlightSearchRoute {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('/') {
            "search" => Ok(FlightSearchRoute::Search),
            "searchFlights" => Ok(FlightSearchRoute::SearchFlights),
            other => Err(ApiError::Config(format!("unknown flight search route \"{other}\""))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_host: String,
    pub flight_search_route: FlightSearchRoute,
    /// Reserved prefix of every cache key.
    pub cache_prefix: String,
    /// Whether flight searches go through the response cache.
    pub cache_flight_searches: bool,
    /// Location of the file-backed store, when one is used.
    pub cache_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            api_host: String::new(),
            flight_search_route: FlightSearchRoute::default(),
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            cache_flight_searches: false,
            cache_path: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str, api_key: &str, api_host: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            api_host: api_host.to_string(),
            ..Self::default()
        }
    }

    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ApiError> {
        if let Ok(path) = dotenvy::dotenv() {
            info!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup.
    ///
    /// Each credential is read from its upper-case name first, then from the
    /// legacy mixed-case spelling.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ApiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |keys: &[&str]| -> String {
            keys.iter().find_map(|key| lookup(key)).unwrap_or_else(|| {
                warn!("Environment variable {} not set, requests will fail", keys[0]);
                String::new()
            })
        };

        let mut config = Self {
            base_url: required(&["RAPIDAPI_BASE_URL", "RapidAPI_BaseURL"]),
            api_key: required(&["RAPIDAPI_KEY", "RapidAPI_KEY"]),
            api_host: required(&["RAPIDAPI_HOST", "RapidAPI_HOST"]),
            ..Self::default()
        };

        if let Some(route) = lookup("FLIGHT_SEARCH_ROUTE") {
            config.flight_search_route = route.parse()?;
        }
        if let Some(prefix) = lookup("FLIGHT_CACHE_PREFIX") {
            config.cache_prefix = prefix;
        }
        if let Some(flag) = lookup("FLIGHT_CACHE_SEARCHES") {
            config.cache_flight_searches = flag.trim().parse().map_err(|_| {
                ApiError::Config(format!("FLIGHT_CACHE_SEARCHES must be true or false, got \"{flag}\""))
            })?;
        }
        config.cache_path = lookup("FLIGHT_CACHE_PATH").map(PathBuf::from);

        Ok(config)
    }
}
