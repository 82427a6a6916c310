//! Validation of outbound flight-search parameters.
//!
//! `search_flights_params` checks every field of a `SearchFlightOptions`
//! and either returns the normalized `SearchFlightsParams` or a
//! `ValidationError` naming all rejected fields at once.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::config::FlightSearchRoute;
use crate::error::{FieldIssue, ValidationError};
use crate::types::{AirportResult, CabinClass, SearchFlightOptions};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Flight-search parameters in the form sent upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFlightsParams {
    pub origin_sky_id: String,
    pub destination_sky_id: String,
    pub origin_entity_id: i64,
    pub destination_entity_id: i64,
    pub depart_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub cabin_class: CabinClass,
    pub adults: u32,
    pub children: Option<u32>,
    pub infants: Option<u32>,
}

impl SearchFlightsParams {
    /// Query pairs for `route`. Optional parameters are omitted, not sent
    /// empty.
    pub fn to_query(&self, route: FlightSearchRoute) -> Vec<(String, String)> {
        let mut query = vec![
            ("originSkyId".to_string(), self.origin_sky_id.clone()),
            ("destinationSkyId".to_string(), self.destination_sky_id.clone()),
            ("originEntityId".to_string(), self.origin_entity_id.to_string()),
            (
                "destinationEntityId".to_string(),
                self.destination_entity_id.to_string(),
            ),
            (
                route.date_param().to_string(),
                self.depart_date.format(DATE_FORMAT).to_string(),
            ),
        ];
        if let Some(date) = self.return_date {
            query.push(("returnDate".to_string(), date.format(DATE_FORMAT).to_string()));
        }
        query.push(("cabinClass".to_string(), self.cabin_class.as_wire().to_string()));
        query.push(("adults".to_string(), self.adults.to_string()));
        if let Some(children) = self.children {
            query.push(("children".to_string(), children.to_string()));
        }
        if let Some(infants) = self.infants {
            query.push(("infants".to_string(), infants.to_string()));
        }
        query
    }
}

/// Validate and normalize raw search options.
pub fn search_flights_params(
    options: &SearchFlightOptions,
) -> Result<SearchFlightsParams, ValidationError> {
    let mut issues = Vec::new();

    let origin_sky_id = sky_id("originSkyId", options.origin.as_ref(), &mut issues);
    let destination_sky_id = sky_id("destinationSkyId", options.destination.as_ref(), &mut issues);
    let origin_entity_id = entity_id("originEntityId", options.origin.as_ref(), &mut issues);
    let destination_entity_id =
        entity_id("destinationEntityId", options.destination.as_ref(), &mut issues);

    let depart_date = match options.depart_date.as_deref() {
        Some(raw) => record(&mut issues, "departDate", coerce_date(raw)),
        None => {
            issues.push(issue("departDate", "is required"));
            None
        }
    };
    let return_date = options
        .return_date
        .as_deref()
        .and_then(|raw| record(&mut issues, "returnDate", coerce_date(raw)));

    let cabin_class = match options.cabin_class.as_deref() {
        None => Some(CabinClass::default()),
        Some(raw) => record(&mut issues, "cabinClass", raw.parse()),
    };

    let adults = match options.adults {
        None => Some(1),
        Some(n) if n < 1 => {
            issues.push(issue("adults", "must be at least 1"));
            None
        }
        Some(n) => record(&mut issues, "adults", count(n)),
    };
    let children = options
        .children
        .and_then(|n| record(&mut issues, "children", count(n)));
    let infants = options
        .infants
        .and_then(|n| record(&mut issues, "infants", count(n)));

    match (
        origin_sky_id,
        destination_sky_id,
        origin_entity_id,
        destination_entity_id,
        depart_date,
        cabin_class,
        adults,
    ) {
        (
            Some(origin_sky_id),
            Some(destination_sky_id),
            Some(origin_entity_id),
            Some(destination_entity_id),
            Some(depart_date),
            Some(cabin_class),
            Some(adults),
        ) if issues.is_empty() => Ok(SearchFlightsParams {
            origin_sky_id,
            destination_sky_id,
            origin_entity_id,
            destination_entity_id,
            depart_date,
            return_date,
            cabin_class,
            adults,
            children,
            infants,
        }),
        _ => Err(ValidationError { issues }),
    }
}

/// Coerce a date-like string to a calendar date, dropping any time of day.
/// Offset timestamps are moved to UTC before the time is dropped.
pub fn coerce_date(raw: &str) -> Result<NaiveDate, String> {
    let s = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc).date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(dt.date());
        }
    }
    Err(format!("\"{s}\" is not a date"))
}

/// Coerce numeric-like text to an integer: `" 95565050 "` and `"1e3"` are
/// accepted, `"12.5"` and `""` are not.
pub fn coerce_integer(raw: &str) -> Result<i64, String> {
    let s = raw.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Ok(n);
    }
    match s.parse::<f64>() {
        Ok(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 => Ok(n as i64),
        Ok(_) => Err(format!("\"{s}\" is not an integer")),
        Err(_) => Err(format!("\"{s}\" is not a number")),
    }
}

fn sky_id(
    field: &'static str,
    airport: Option<&AirportResult>,
    issues: &mut Vec<FieldIssue>,
) -> Option<String> {
    match airport.map(|a| a.sky_id.trim()) {
        Some(id) if !id.is_empty() => Some(id.to_string()),
        Some(_) => {
            issues.push(issue(field, "must not be empty"));
            None
        }
        None => {
            issues.push(issue(field, "is required"));
            None
        }
    }
}

fn entity_id(
    field: &'static str,
    airport: Option<&AirportResult>,
    issues: &mut Vec<FieldIssue>,
) -> Option<i64> {
    match airport {
        Some(a) => record(issues, field, coerce_integer(&a.entity_id)),
        None => {
            issues.push(issue(field, "is required"));
            None
        }
    }
}

fn count(n: i64) -> Result<u32, String> {
    u32::try_from(n).map_err(|_| format!("{n} is not a valid passenger count"))
}

fn record<T>(issues: &mut Vec<FieldIssue>, field: &'static str, result: Result<T, String>) -> Option<T> {
    result.map_err(|message| issues.push(FieldIssue { field, message })).ok()
}

fn issue(field: &'static str, message: &str) -> FieldIssue {
    FieldIssue {
        field,
        message: message.to_string(),
    }
}
