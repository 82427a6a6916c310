//! Cache-or-fetch service over the Sky Scrapper API.
//!
//! # Design
//! `FlightSearch` wires the I/O-free `SkyScrapperClient` to a `Transport`
//! and a `ResponseCache`. Every operation checks the cache, otherwise goes
//! upstream, stores the envelope when the provider flagged it successful,
//! and returns the unwrapped payload. Concurrent misses on the same key are
//! not coalesced; both go upstream and the later store wins.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::cache::{airport_query_key, coordinates_key, flight_search_key, ResponseCache};
use crate::client::SkyScrapperClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::store::{FileStore, KeyValueStore, MemoryStore};
use crate::types::{
    AirportResult, ApiResponse, Coordinates, FlightSearchData, NearbyAirports, SearchFlightOptions,
};
use crate::validate::search_flights_params;

pub struct FlightSearch<S, T> {
    client: SkyScrapperClient,
    cache: ResponseCache<S>,
    transport: T,
    cache_flight_searches: bool,
}

impl<S: KeyValueStore, T: Transport> FlightSearch<S, T> {
    pub fn new(config: &ClientConfig, store: S, transport: T) -> Self {
        Self {
            client: SkyScrapperClient::new(config),
            cache: ResponseCache::new(store, &config.cache_prefix),
            transport,
            cache_flight_searches: config.cache_flight_searches,
        }
    }

    pub fn client(&self) -> &SkyScrapperClient {
        &self.client
    }

    pub fn cache(&self) -> &ResponseCache<S> {
        &self.cache
    }

    /// Airports matching free text. A blank query returns nothing without
    /// touching the cache or the network.
    pub async fn search_airport(&self, query: &str) -> Result<Vec<AirportResult>, ApiError> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let request = self.client.build_search_airport(query);
        self.fetch_cached(&airport_query_key(query), request, SkyScrapperClient::parse_search_airport)
            .await
    }

    /// Best-match airport and alternates around `coordinates`.
    pub async fn get_nearby_airports(
        &self,
        coordinates: Coordinates,
    ) -> Result<NearbyAirports, ApiError> {
        let request = self.client.build_nearby_airports(coordinates);
        self.fetch_cached(
            &coordinates_key(coordinates),
            request,
            SkyScrapperClient::parse_nearby_airports,
        )
        .await
    }

    /// Validate `options` and search flights. Validation failures return
    /// before any request is built.
    pub async fn search_flights(
        &self,
        options: &SearchFlightOptions,
    ) -> Result<FlightSearchData, ApiError> {
        let params = search_flights_params(options)?;
        let request = self.client.build_search_flights(&params);
        if self.cache_flight_searches {
            let key = flight_search_key(&params, self.client.route());
            return self
                .fetch_cached(&key, request, SkyScrapperClient::parse_search_flights)
                .await;
        }
        let response = self.transport.execute(request).await?;
        self.client.parse_search_flights(response)?.into_data()
    }

    /// Drop every cached response. Returns how many entries were removed.
    pub fn clear_cache(&self) -> Result<usize, ApiError> {
        self.cache.clear()
    }

    async fn fetch_cached<D, P>(&self, key: &str, request: HttpRequest, parse: P) -> Result<D, ApiError>
    where
        D: DeserializeOwned,
        P: FnOnce(&SkyScrapperClient, HttpResponse) -> Result<ApiResponse<D>, ApiError>,
    {
        if let Some(cached) = self.cache.lookup(key) {
            return cached.response.into_data();
        }
        let response = self.transport.execute(request).await?;
        let body = response.body.clone();
        let envelope = parse(&self.client, response)?;
        match self.cache.store(key, &body) {
            Ok(true) => {}
            Ok(false) => debug!(key, "upstream reported failure, response not cached"),
            Err(e) => warn!(key, error = %e, "failed to cache response"),
        }
        envelope.into_data()
    }
}

impl FlightSearch<Arc<dyn KeyValueStore>, ReqwestTransport> {
    /// Service over reqwest, persisting to `config.cache_path` when set and
    /// to memory otherwise.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let store: Arc<dyn KeyValueStore> = match &config.cache_path {
            Some(path) => Arc::new(FileStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };
        Ok(Self::new(config, store, ReqwestTransport::new()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    /// Serves canned bodies by URL path and records every request.
    #[derive(Default)]
    struct FakeTransport {
        bodies: HashMap<&'static str, String>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl FakeTransport {
        fn with(mut self, path: &'static str, body: serde_json::Value) -> Self {
            self.bodies.insert(path, body.to_string());
            self
        }

        fn calls(&self) -> usize {
            self.requests.lock().len()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            let path = request.url.trim_start_matches("http://upstream").to_string();
            self.requests.lock().push(request);
            match self.bodies.get(path.as_str()) {
                Some(body) => Ok(HttpResponse {
                    status: 200,
                    body: body.clone(),
                }),
                None => Err(ApiError::Transport(format!("no route for {path}"))),
            }
        }
    }

    fn airport_json(sky_id: &str, entity_id: &str, title: &str) -> serde_json::Value {
        json!({
            "skyId": sky_id,
            "entityId": entity_id,
            "presentation": {"title": title, "suggestionTitle": format!("{title} ({sky_id})"), "subtitle": ""}
        })
    }

    fn service(
        transport: FakeTransport,
        config: ClientConfig,
    ) -> (Arc<MemoryStore>, Arc<FakeTransport>, FlightSearch<Arc<MemoryStore>, Arc<FakeTransport>>) {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(transport);
        let service = FlightSearch::new(&config, store.clone(), transport.clone());
        (store, transport, service)
    }

    fn config() -> ClientConfig {
        ClientConfig::new("http://upstream", "key", "host")
    }

    fn airports_transport() -> FakeTransport {
        FakeTransport::default().with(
            "/searchAirport",
            json!({"status": true, "data": [airport_json("LHR", "95565050", "London Heathrow")]}),
        )
    }

    fn options() -> SearchFlightOptions {
        SearchFlightOptions::one_way(
            AirportResult::new("LHR", "95565050", "London Heathrow"),
            AirportResult::new("JFK", "95565058", "New York John F. Kennedy"),
            "2024-10-01",
        )
    }

    #[tokio::test]
    async fn repeated_airport_search_is_served_from_cache() {
        let (_, transport, service) = service(airports_transport(), config());
        let first = service.search_airport("london").await.unwrap();
        let second = service.search_airport("london").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].sky_id, "LHR");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn query_text_is_not_normalized() {
        let (_, transport, service) = service(airports_transport(), config());
        service.search_airport("london").await.unwrap();
        service.search_airport("London").await.unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn blank_query_touches_nothing() {
        let (store, transport, service) = service(airports_transport(), config());
        for query in ["", "   ", "\t\n"] {
            assert!(service.search_airport(query).await.unwrap().is_empty());
        }
        assert_eq!(transport.calls(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn failed_envelope_is_not_cached() {
        let transport = FakeTransport::default().with(
            "/searchAirport",
            json!({"status": false, "message": "Something went wrong"}),
        );
        let (store, transport, service) = service(transport, config());
        let err = service.search_airport("london").await.unwrap_err();
        assert!(matches!(err, ApiError::Upstream { .. }));
        assert!(store.is_empty());
        service.search_airport("london").await.unwrap_err();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn corrupt_cache_entry_falls_through_to_network() {
        let (store, transport, service) = service(airports_transport(), config());
        store.set("skyscrapper:london", "{broken").unwrap();
        let airports = service.search_airport("london").await.unwrap();
        assert_eq!(airports[0].sky_id, "LHR");
        assert_eq!(transport.calls(), 1);
        assert!(store.get("skyscrapper:london").unwrap().unwrap().starts_with('{'));
        assert!(service.cache().lookup::<Vec<AirportResult>>("london").is_some());
    }

    #[tokio::test]
    async fn cached_entry_is_the_upstream_body() {
        let upstream = json!({
            "status": true,
            "sessionId": "abc",
            "data": [{
                "skyId": "LHR",
                "entityId": "95565050",
                "presentation": {"title": "London Heathrow"},
                "navigation": {
                    "entityType": "AIRPORT",
                    "relevantFlightParams": {"skyId": "LHR", "entityId": "95565050"}
                }
            }]
        });
        let transport = FakeTransport::default().with("/searchAirport", upstream.clone());
        let (store, _, service) = service(transport, config());
        service.search_airport("london").await.unwrap();

        let stored = store.get("skyscrapper:london").unwrap().unwrap();
        assert_eq!(stored, upstream.to_string());
    }

    #[tokio::test]
    async fn nearby_lookups_share_rounded_bucket() {
        let transport = FakeTransport::default().with(
            "/getNearByAirports",
            json!({"status": true, "data": {
                "current": airport_json("LHR", "95565050", "London Heathrow"),
                "nearby": [airport_json("LGW", "95565051", "London Gatwick")],
                "recent": []
            }}),
        );
        let (store, transport, service) = service(transport, config());
        let first = service
            .get_nearby_airports(Coordinates::new(51.4712, -0.4543))
            .await
            .unwrap();
        let second = service
            .get_nearby_airports(Coordinates::new(51.4689, -0.4511))
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.current.sky_id, "LHR");
        assert_eq!(first.nearby[0].sky_id, "LGW");
        assert_eq!(transport.calls(), 1);
        assert_eq!(store.keys().unwrap(), vec!["skyscrapper:-0.45,51.47".to_string()]);
    }

    #[tokio::test]
    async fn invalid_flight_search_never_reaches_network() {
        let (_, transport, service) = service(FakeTransport::default(), config());
        let mut opts = options();
        opts.adults = Some(0);
        let err = service.search_flights(&opts).await.unwrap_err();
        match err {
            ApiError::Validation(v) => assert_eq!(v.fields(), vec!["adults"]),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(transport.calls(), 0);
    }

    fn flights_transport() -> FakeTransport {
        FakeTransport::default().with(
            "/search",
            json!({"status": true, "data": {
                "context": {"status": "complete", "totalResults": 1},
                "itineraries": [{"id": "it-1", "price": {"raw": 420.0, "formatted": "$420"}}]
            }}),
        )
    }

    #[tokio::test]
    async fn flight_search_is_not_cached_by_default() {
        let (store, transport, service) = service(flights_transport(), config());
        let data = service.search_flights(&options()).await.unwrap();
        assert_eq!(data.itineraries[0].id, "it-1");
        service.search_flights(&options()).await.unwrap();
        assert_eq!(transport.calls(), 2);
        assert!(store.is_empty());

        let sent = transport.requests.lock()[0].clone();
        assert_eq!(sent.query_param("adults"), Some("1"));
        assert_eq!(sent.query_param("cabinClass"), Some("economy"));
    }

    #[tokio::test]
    async fn flight_search_can_be_cached() {
        let mut cfg = config();
        cfg.cache_flight_searches = true;
        let (store, transport, service) = service(flights_transport(), cfg);
        service.search_flights(&options()).await.unwrap();
        service.search_flights(&options()).await.unwrap();
        assert_eq!(transport.calls(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn clear_cache_forces_refetch() {
        let (store, transport, service) = service(airports_transport(), config());
        store.set("unrelated", "1").unwrap();
        service.search_airport("london").await.unwrap();
        assert_eq!(service.clear_cache().unwrap(), 1);
        service.search_airport("london").await.unwrap();
        assert_eq!(transport.calls(), 2);
        assert_eq!(store.get("unrelated").unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let (store, _, service) = service(FakeTransport::default(), config());
        let err = service.search_airport("london").await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert!(store.is_empty());
    }
}
