//! Stateless HTTP request builder and response parser for the Sky Scrapper
//! flight-data API.
//!
//! # Design
//! `SkyScrapperClient` holds the base URL, the two RapidAPI credential
//! headers and the flight-search route. Each operation is split into a
//! `build_*` method that produces an `HttpRequest` and a `parse_*` method
//! that consumes an `HttpResponse`. Caching and transport live in
//! `service`, keeping this layer deterministic.

use serde::de::DeserializeOwned;

use crate::config::{ClientConfig, FlightSearchRoute};
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::types::{AirportResult, ApiResponse, Coordinates, FlightSearchData, NearbyAirports};
use crate::validate::SearchFlightsParams;

pub const KEY_HEADER: &str = "x-rapidapi-key";
pub const HOST_HEADER: &str = "x-rapidapi-host";

#[derive(Debug, Clone)]
pub struct SkyScrapperClient {
    base_url: String,
    api_key: String,
    api_host: String,
    route: FlightSearchRoute,
}

impl SkyScrapperClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_host: config.api_host.clone(),
            route: config.flight_search_route,
        }
    }

    pub fn route(&self) -> FlightSearchRoute {
        self.route
    }

    pub fn build_search_airport(&self, query: &str) -> HttpRequest {
        self.get("/searchAirport", vec![("query".to_string(), query.to_string())])
    }

    pub fn build_nearby_airports(&self, coordinates: Coordinates) -> HttpRequest {
        self.get(
            "/getNearByAirports",
            vec![
                ("lat".to_string(), coordinates.latitude.to_string()),
                ("lng".to_string(), coordinates.longitude.to_string()),
            ],
        )
    }

    pub fn build_search_flights(&self, params: &SearchFlightsParams) -> HttpRequest {
        self.get(self.route.path(), params.to_query(self.route))
    }

    pub fn parse_search_airport(
        &self,
        response: HttpResponse,
    ) -> Result<ApiResponse<Vec<AirportResult>>, ApiError> {
        parse_envelope(response)
    }

    pub fn parse_nearby_airports(
        &self,
        response: HttpResponse,
    ) -> Result<ApiResponse<NearbyAirports>, ApiError> {
        parse_envelope(response)
    }

    pub fn parse_search_flights(
        &self,
        response: HttpResponse,
    ) -> Result<ApiResponse<FlightSearchData>, ApiError> {
        parse_envelope(response)
    }

    fn get(&self, path: &str, query: Vec<(String, String)>) -> HttpRequest {
        HttpRequest {
            url: format!("{}{path}", self.base_url),
            query,
            headers: vec![
                (KEY_HEADER.to_string(), self.api_key.clone()),
                (HOST_HEADER.to_string(), self.api_host.clone()),
            ],
        }
    }
}

fn parse_envelope<T: DeserializeOwned>(response: HttpResponse) -> Result<ApiResponse<T>, ApiError> {
    check_status(&response)?;
    serde_json::from_str(&response.body).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}
