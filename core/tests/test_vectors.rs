//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results. Comparing parsed JSON (not raw strings) avoids
//! false negatives from field-ordering differences.

use flight_search_core::cache::{airport_query_key, coordinates_key};
use flight_search_core::{
    search_flights_params, AirportResult, ApiError, ClientConfig, Coordinates, FlightSearchRoute,
    HttpRequest, HttpResponse, SearchFlightOptions, SkyScrapperClient,
};

const BASE_URL: &str = "http://localhost:3000";

fn client_for(route: FlightSearchRoute) -> SkyScrapperClient {
    let mut config = ClientConfig::new(BASE_URL, "test-key", "sky-scrapper.p.rapidapi.com");
    config.flight_search_route = route;
    SkyScrapperClient::new(&config)
}

fn client() -> SkyScrapperClient {
    client_for(FlightSearchRoute::Search)
}

fn pairs(value: &serde_json::Value) -> Vec<(String, String)> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|p| {
            let arr = p.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect()
}

/// Compare a built request against `expected_request`. Headers are only
/// checked when the vector lists them.
fn assert_request(name: &str, req: &HttpRequest, expected: &serde_json::Value) {
    assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");
    assert_eq!(req.query, pairs(&expected["query"]), "{name}: query");
    if let Some(headers) = expected.get("headers") {
        assert_eq!(req.headers, pairs(headers), "{name}: headers");
    }
}

fn simulated(case: &serde_json::Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse {
        status: sim["status"].as_u64().unwrap() as u16,
        body: sim["body"].as_str().unwrap().to_string(),
    }
}

// ---------------------------------------------------------------------------
// Airport search
// ---------------------------------------------------------------------------

#[test]
fn search_airport_test_vectors() {
    let raw = include_str!("../../test-vectors/search_airport.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let query = case["input_query"].as_str().unwrap();

        // Verify build
        let req = c.build_search_airport(query);
        assert_request(name, &req, &case["expected_request"]);
        assert_eq!(airport_query_key(query), case["expected_cache_key"].as_str().unwrap(), "{name}: cache key");

        // Verify parse
        let result = c.parse_search_airport(simulated(case));
        if let Some(expected_error) = case.get("expected_error") {
            let err = match result {
                Ok(envelope) => {
                    assert_eq!(
                        envelope.succeeded(),
                        case["expected_cacheable"].as_bool().unwrap(),
                        "{name}: cacheable"
                    );
                    envelope.into_data().unwrap_err()
                }
                Err(err) => err,
            };
            match expected_error.as_str().unwrap() {
                "NotFound" => assert!(matches!(err, ApiError::NotFound), "{name}: expected NotFound"),
                "Upstream" => assert!(matches!(err, ApiError::Upstream { .. }), "{name}: expected Upstream"),
                other => panic!("{name}: unknown expected_error: {other}"),
            }
        } else {
            let envelope = result.unwrap();
            assert_eq!(envelope.succeeded(), case["expected_cacheable"].as_bool().unwrap(), "{name}: cacheable");
            let airports = envelope.into_data().unwrap();
            let expected: Vec<AirportResult> = serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(airports, expected, "{name}: parsed result");
        }
    }
}

// ---------------------------------------------------------------------------
// Nearby airports
// ---------------------------------------------------------------------------

#[test]
fn nearby_airports_test_vectors() {
    let raw = include_str!("../../test-vectors/nearby_airports.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let coords = Coordinates::new(
            case["input"]["lat"].as_f64().unwrap(),
            case["input"]["lng"].as_f64().unwrap(),
        );

        // Verify build
        let req = c.build_nearby_airports(coords);
        assert_request(name, &req, &case["expected_request"]);
        assert_eq!(coordinates_key(coords), case["expected_cache_key"].as_str().unwrap(), "{name}: cache key");

        // Verify parse
        let nearby = c.parse_nearby_airports(simulated(case)).unwrap().into_data().unwrap();
        assert_eq!(nearby.current.sky_id, case["expected_current"].as_str().unwrap(), "{name}: current");
        let alternates: Vec<&str> = nearby.nearby.iter().map(|a| a.sky_id.as_str()).collect();
        let expected: Vec<&str> = case["expected_nearby"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(alternates, expected, "{name}: nearby");
    }
}

// ---------------------------------------------------------------------------
// Flight search
// ---------------------------------------------------------------------------

#[test]
fn search_flights_test_vectors() {
    let raw = include_str!("../../test-vectors/search_flights.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let route: FlightSearchRoute = case["route"].as_str().unwrap().parse().unwrap();
        let options: SearchFlightOptions = serde_json::from_value(case["input"].clone()).unwrap();

        let result = search_flights_params(&options);
        if let Some(fields) = case.get("expected_error_fields") {
            let err = result.unwrap_err();
            let expected: Vec<&str> = fields.as_array().unwrap().iter().map(|f| f.as_str().unwrap()).collect();
            assert_eq!(err.fields(), expected, "{name}: rejected fields");
        } else {
            let req = client_for(route).build_search_flights(&result.unwrap());
            assert_request(name, &req, &case["expected_request"]);
        }
    }
}
