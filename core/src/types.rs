//! Domain DTOs for the Sky Scrapper flight-data API.
//!
//! # Design
//! Field names follow the upstream camelCase wire format. Response types are
//! lenient (`#[serde(default)]`) because the provider omits fields freely;
//! the request bag `SearchFlightOptions` is deliberately loose so that
//! `validate` can reject it with field-specific errors instead of failing
//! deserialization.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Display block of an airport suggestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Presentation {
    pub title: String,
    pub suggestion_title: String,
    pub subtitle: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Navigation {
    pub entity_id: String,
    pub entity_type: String,
    pub localized_name: String,
}

/// An airport or city as returned by airport search and nearby lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AirportResult {
    pub sky_id: String,
    pub entity_id: String,
    pub presentation: Presentation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation: Option<Navigation>,
}

impl AirportResult {
    pub fn new(sky_id: &str, entity_id: &str, title: &str) -> Self {
        Self {
            sky_id: sky_id.to_string(),
            entity_id: entity_id.to_string(),
            presentation: Presentation {
                title: title.to_string(),
                suggestion_title: format!("{title} ({sky_id})"),
                subtitle: String::new(),
            },
            navigation: None,
        }
    }

    /// Label shown in the picker. Falls back to the bare title when the
    /// provider sends no suggestion title.
    pub fn label(&self) -> &str {
        if self.presentation.suggestion_title.is_empty() {
            &self.presentation.title
        } else {
            &self.presentation.suggestion_title
        }
    }

    /// Case-insensitive substring match of user input against the label.
    pub fn matches_input(&self, input: &str) -> bool {
        let needle = input.trim().to_lowercase();
        !needle.is_empty() && self.label().to_lowercase().contains(&needle)
    }
}

/// Result of the nearby-airports lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyAirports {
    pub current: AirportResult,
    #[serde(default)]
    pub nearby: Vec<AirportResult>,
    #[serde(default)]
    pub recent: Vec<AirportResult>,
}

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CabinClass {
    #[default]
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl CabinClass {
    pub const ALL: [CabinClass; 4] = [
        CabinClass::Economy,
        CabinClass::PremiumEconomy,
        CabinClass::Business,
        CabinClass::First,
    ];

    /// Value sent in the `cabinClass` query parameter.
    pub fn as_wire(&self) -> &'static str {
        match self {
            CabinClass::Economy => "economy",
            CabinClass::PremiumEconomy => "premium_economy",
            CabinClass::Business => "business",
            CabinClass::First => "first",
        }
    }
}

impl fmt::Display for CabinClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl FromStr for CabinClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        CabinClass::ALL
            .into_iter()
            .find(|class| class.as_wire().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown cabin class \"{wanted}\""))
    }
}

/// Raw flight-search input as collected by the form.
///
/// Nothing here is trusted: dates are free text, counts are signed, and the
/// airports may be missing. `validate::search_flights_params` turns it into
/// the parameters actually sent upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchFlightOptions {
    pub origin: Option<AirportResult>,
    pub destination: Option<AirportResult>,
    pub depart_date: Option<String>,
    pub return_date: Option<String>,
    pub cabin_class: Option<String>,
    pub adults: Option<i64>,
    pub children: Option<i64>,
    pub infants: Option<i64>,
}

impl SearchFlightOptions {
    pub fn one_way(origin: AirportResult, destination: AirportResult, depart_date: &str) -> Self {
        Self {
            origin: Some(origin),
            destination: Some(destination),
            depart_date: Some(depart_date.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchContext {
    pub status: String,
    pub total_results: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Price {
    pub raw: f64,
    pub formatted: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Place {
    pub id: String,
    pub name: String,
    pub display_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Carrier {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Carriers {
    pub marketing: Vec<Carrier>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Leg {
    pub id: String,
    pub origin: Place,
    pub destination: Place,
    pub duration_in_minutes: u32,
    pub stop_count: u32,
    pub departure: String,
    pub arrival: String,
    pub carriers: Carriers,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Itinerary {
    pub id: String,
    pub price: Price,
    pub legs: Vec<Leg>,
    pub tags: Vec<String>,
}

/// Payload of a flight search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightSearchData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<SearchContext>,
    pub itineraries: Vec<Itinerary>,
}

/// The upstream response envelope.
///
/// `status` is kept as raw JSON and judged by truthiness. Top-level fields the
/// client does not model (`timestamp`, `sessionId`, ...) are kept in `extra`.
/// The cache stores the body as received, not this typed view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub status: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<T> ApiResponse<T> {
    /// Envelope for a successful payload.
    pub fn success(data: T) -> Self {
        Self {
            status: Value::Bool(true),
            message: None,
            data: Some(data),
            extra: Map::new(),
        }
    }

    /// Whether the provider flagged this response as successful.
    pub fn succeeded(&self) -> bool {
        is_truthy(&self.status)
    }

    /// Unwrap the payload. A missing payload is an upstream failure.
    pub fn into_data(self) -> Result<T, ApiError> {
        match self.data {
            Some(data) => Ok(data),
            None => Err(ApiError::Upstream {
                message: describe_message(self.message.as_ref()),
            }),
        }
    }
}

/// JavaScript truthiness of a JSON value, which is how the provider's
/// `status` flag is meant to be read.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn describe_message(message: Option<&Value>) -> String {
    match message {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "response carried no data".to_string(),
    }
}
