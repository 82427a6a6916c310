use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::info;

pub const KEY_HEADER: &str = "x-rapidapi-key";

/// Query text that makes `/searchAirport` answer 200 with `status: false`.
pub const FAILING_QUERY: &str = "fail";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    pub title: String,
    pub suggestion_title: String,
    pub subtitle: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Airport {
    pub sky_id: String,
    pub entity_id: String,
    pub presentation: Presentation,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Nearby {
    pub current: Airport,
    pub nearby: Vec<Airport>,
    pub recent: Vec<Airport>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: String,
    pub name: String,
    pub display_code: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leg {
    pub id: String,
    pub origin: Place,
    pub destination: Place,
    pub duration_in_minutes: u32,
    pub stop_count: u32,
    pub departure: String,
    pub arrival: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Price {
    pub raw: f64,
    pub formatted: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Itinerary {
    pub id: String,
    pub price: Price,
    pub legs: Vec<Leg>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub status: String,
    pub total_results: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Flights {
    pub context: Context,
    pub itineraries: Vec<Itinerary>,
}

/// Upstream response envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub status: bool,
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    fn ok(data: T) -> Self {
        Self {
            status: true,
            timestamp: now_millis(),
            message: None,
            data: Some(data),
        }
    }

    fn failed(message: serde_json::Value) -> Self {
        Self {
            status: false,
            timestamp: now_millis(),
            message: Some(message),
            data: None,
        }
    }
}

/// Per-route request counters, shared with tests.
#[derive(Debug, Default)]
pub struct Hits {
    pub search_airport: AtomicUsize,
    pub nearby_airports: AtomicUsize,
    pub search_flights: AtomicUsize,
}

impl Hits {
    pub fn search_airport(&self) -> usize {
        self.search_airport.load(Ordering::SeqCst)
    }

    pub fn nearby_airports(&self) -> usize {
        self.nearby_airports.load(Ordering::SeqCst)
    }

    pub fn search_flights(&self) -> usize {
        self.search_flights.load(Ordering::SeqCst)
    }
}

/// Counters shared by the router and whoever inspects them.
pub type SharedHits = Arc<Hits>;

type Rejection = (StatusCode, Json<serde_json::Value>);

#[derive(Deserialize)]
pub struct AirportQuery {
    pub query: String,
}

#[derive(Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
}

struct Fixture {
    sky_id: &'static str,
    entity_id: &'static str,
    title: &'static str,
    subtitle: &'static str,
    lat: f64,
    lng: f64,
}

const AIRPORTS: &[Fixture] = &[
    Fixture { sky_id: "LHR", entity_id: "95565050", title: "London Heathrow", subtitle: "United Kingdom", lat: 51.4700, lng: -0.4543 },
    Fixture { sky_id: "LGW", entity_id: "95565051", title: "London Gatwick", subtitle: "United Kingdom", lat: 51.1537, lng: -0.1821 },
    Fixture { sky_id: "STN", entity_id: "95565052", title: "London Stansted", subtitle: "United Kingdom", lat: 51.8860, lng: 0.2389 },
    Fixture { sky_id: "JFK", entity_id: "95565058", title: "New York John F. Kennedy", subtitle: "United States", lat: 40.6413, lng: -73.7781 },
    Fixture { sky_id: "EWR", entity_id: "95565059", title: "New York Newark", subtitle: "United States", lat: 40.6895, lng: -74.1745 },
    Fixture { sky_id: "CDG", entity_id: "95565041", title: "Paris Charles de Gaulle", subtitle: "France", lat: 49.0097, lng: 2.5479 },
];

impl Fixture {
    fn airport(&self) -> Airport {
        Airport {
            sky_id: self.sky_id.to_string(),
            entity_id: self.entity_id.to_string(),
            presentation: Presentation {
                title: self.title.to_string(),
                suggestion_title: format!("{} ({})", self.title, self.sky_id),
                subtitle: self.subtitle.to_string(),
            },
        }
    }

    fn distance_sq(&self, lat: f64, lng: f64) -> f64 {
        (self.lat - lat).powi(2) + (self.lng - lng).powi(2)
    }

    fn by_sky_id(sky_id: &str) -> Option<&'static Fixture> {
        AIRPORTS.iter().find(|f| f.sky_id == sky_id)
    }
}

pub fn app() -> Router {
    app_with_hits(SharedHits::default())
}

pub fn app_with_hits(hits: SharedHits) -> Router {
    Router::new()
        .route("/searchAirport", get(search_airport))
        .route("/getNearByAirports", get(nearby_airports))
        .route("/search", get(search_departing))
        .route("/searchFlights", get(search_dated))
        .with_state(hits)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_hits(listener, SharedHits::default()).await
}

pub async fn run_with_hits(listener: TcpListener, hits: SharedHits) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!("mock upstream listening on {addr}");
    }
    axum::serve(listener, app_with_hits(hits)).await
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

fn authorize(headers: &HeaderMap) -> Result<(), Rejection> {
    let key = headers
        .get(KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if key.is_empty() {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"message": "Invalid API key. Go to https://docs.rapidapi.com/docs/keys for more info."})),
        ));
    }
    Ok(())
}

async fn search_airport(
    State(hits): State<SharedHits>,
    headers: HeaderMap,
    Query(q): Query<AirportQuery>,
) -> Result<Json<Envelope<Vec<Airport>>>, Rejection> {
    authorize(&headers)?;
    hits.search_airport.fetch_add(1, Ordering::SeqCst);
    if q.query.trim().eq_ignore_ascii_case(FAILING_QUERY) {
        return Ok(Json(Envelope::failed("Something went wrong".into())));
    }
    let needle = q.query.trim().to_lowercase();
    let airports = AIRPORTS
        .iter()
        .filter(|f| {
            f.title.to_lowercase().contains(&needle) || f.sky_id.to_lowercase() == needle
        })
        .map(Fixture::airport)
        .collect();
    Ok(Json(Envelope::ok(airports)))
}

async fn nearby_airports(
    State(hits): State<SharedHits>,
    headers: HeaderMap,
    Query(q): Query<NearbyQuery>,
) -> Result<Json<Envelope<Nearby>>, Rejection> {
    authorize(&headers)?;
    hits.nearby_airports.fetch_add(1, Ordering::SeqCst);
    let mut ranked: Vec<&Fixture> = AIRPORTS.iter().collect();
    ranked.sort_by(|a, b| a.distance_sq(q.lat, q.lng).total_cmp(&b.distance_sq(q.lat, q.lng)));
    let current = ranked[0].airport();
    let nearby = ranked[1..3].iter().map(|f| f.airport()).collect();
    Ok(Json(Envelope::ok(Nearby {
        current,
        nearby,
        recent: Vec::new(),
    })))
}

async fn search_departing(
    State(hits): State<SharedHits>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Envelope<Flights>>, Rejection> {
    search_flights(hits, headers, q, "departDate")
}

async fn search_dated(
    State(hits): State<SharedHits>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Envelope<Flights>>, Rejection> {
    search_flights(hits, headers, q, "date")
}

fn search_flights(
    hits: SharedHits,
    headers: HeaderMap,
    q: HashMap<String, String>,
    date_param: &str,
) -> Result<Json<Envelope<Flights>>, Rejection> {
    authorize(&headers)?;
    hits.search_flights.fetch_add(1, Ordering::SeqCst);

    let missing: Vec<serde_json::Value> = [
        "originSkyId",
        "destinationSkyId",
        "originEntityId",
        "destinationEntityId",
        date_param,
    ]
    .iter()
    .filter(|p| q.get(**p).map_or(true, |v| v.is_empty()))
    .map(|p| serde_json::json!({ *p: format!("{p} is required") }))
    .collect();
    if !missing.is_empty() {
        return Ok(Json(Envelope::failed(missing.into())));
    }

    let place = |sky_id: &str| {
        let name = Fixture::by_sky_id(sky_id).map_or(sky_id, |f| f.title);
        Place {
            id: sky_id.to_string(),
            name: name.to_string(),
            display_code: sky_id.to_string(),
        }
    };
    let origin = q["originSkyId"].as_str();
    let destination = q["destinationSkyId"].as_str();
    let date = q[date_param].as_str();
    let adults: f64 = q.get("adults").and_then(|a| a.parse().ok()).unwrap_or(1.0);

    let itineraries: Vec<Itinerary> = [(0u32, 420.0, "08:00", "10:55"), (1, 310.0, "13:15", "19:40")]
        .into_iter()
        .enumerate()
        .map(|(i, (stops, fare, dep, arr))| Itinerary {
            id: format!("{origin}-{destination}-{date}-{i}"),
            price: Price {
                raw: fare * adults,
                formatted: format!("${}", fare * adults),
            },
            legs: vec![Leg {
                id: format!("{origin}-{destination}-{i}"),
                origin: place(origin),
                destination: place(destination),
                duration_in_minutes: 475 + stops * 90,
                stop_count: stops,
                departure: format!("{date}T{dep}:00"),
                arrival: format!("{date}T{arr}:00"),
            }],
        })
        .collect();

    Ok(Json(Envelope::ok(Flights {
        context: Context {
            status: "complete".to_string(),
            total_results: itineraries.len(),
        },
        itineraries,
    })))
}
