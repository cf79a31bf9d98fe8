//! Integration tests for the OpenWeather client and the session using wiremock.
//!
//! These verify request shape, failure classification and the unit re-fetch
//! behavior against a mock HTTP server.

use std::net::TcpListener;

use weather_core::{
    Coordinates, FailureKind, IpLocationProvider, LocationError, LocationProvider, LocationQuery,
    OpenWeatherClient, UnitSystem, WeatherClient, WeatherSession,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param, query_param_is_missing},
};

fn paris_body(temp: f64, wind: f64) -> serde_json::Value {
    serde_json::json!({
        "coord": {"lon": 2.3488, "lat": 48.8534},
        "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
        "base": "stations",
        "main": {"temp": temp, "feels_like": 17.9, "humidity": 40, "pressure": 1012},
        "visibility": 10000,
        "wind": {"speed": wind, "deg": 250},
        "dt": 1718000000,
        "sys": {"country": "FR"},
        "name": "Paris",
        "cod": 200
    })
}

fn create_test_client(mock_server: &MockServer) -> OpenWeatherClient {
    OpenWeatherClient::with_base_url("TEST_KEY".to_string(), mock_server.uri())
}

// ============================================================================
// Success scenarios
// ============================================================================

#[tokio::test]
async fn test_fetch_by_name_sends_one_request_and_normalizes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Paris"))
        .and(query_param("units", "metric"))
        .and(query_param("appid", "TEST_KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paris_body(18.3, 3.1)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let result = client
        .fetch_weather(&LocationQuery::by_name(" Paris "), UnitSystem::Metric)
        .await;

    let snapshot = result.expect("expected success");
    assert_eq!(snapshot.location_name, "Paris");
    assert_eq!(snapshot.country, "FR");
    assert_eq!(snapshot.description, "clear sky");
    assert_eq!(snapshot.temperature, 18.3);
    assert_eq!(snapshot.humidity_pct, 40);
    assert_eq!(snapshot.wind_speed, 3.1);
    assert_eq!(snapshot.visibility_m, 10000);
    assert!(snapshot.icon_url().contains("01d"));
}

#[tokio::test]
async fn test_fetch_by_coordinates_uses_lat_lon() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "48.8534"))
        .and(query_param("lon", "2.3488"))
        .and(query_param("units", "imperial"))
        .and(query_param_is_missing("q"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paris_body(64.9, 6.9)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let snapshot = client
        .fetch_weather(
            &LocationQuery::by_coordinates(48.8534, 2.3488),
            UnitSystem::Imperial,
        )
        .await
        .expect("expected success");

    assert_eq!(snapshot.units, UnitSystem::Imperial);
    assert_eq!(snapshot.temperature, 64.9);
}

// ============================================================================
// Error handling scenarios
// ============================================================================

#[tokio::test]
async fn test_blank_name_makes_no_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paris_body(18.3, 3.1)))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    for blank in ["", "   "] {
        let err = client
            .fetch_weather(&LocationQuery::by_name(blank), UnitSystem::Metric)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidInput);
    }
}

#[tokio::test]
async fn test_not_found_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({"cod": "404", "message": "city not found"})),
        )
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let err = client
        .fetch_weather(&LocationQuery::by_name("Atlantis"), UnitSystem::Metric)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::NotFound);
    assert!(err.to_string().contains("city not found"));
}

#[tokio::test]
async fn test_server_error_is_also_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let err = client
        .fetch_weather(&LocationQuery::by_name("Paris"), UnitSystem::Metric)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::NotFound);
}

#[tokio::test]
async fn test_missing_temperature_is_malformed() {
    let mock_server = MockServer::start().await;

    let mut body = paris_body(18.3, 3.1);
    body["main"]
        .as_object_mut()
        .expect("main is an object")
        .remove("temp");

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock_server)
        .await;

    let client = create_test_client(&mock_server);
    let err = client
        .fetch_weather(&LocationQuery::by_name("Paris"), UnitSystem::Metric)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::MalformedResponse);
}

#[tokio::test]
async fn test_transport_error_is_network_error() {
    // Reserve a free port, then release it so nothing is listening there.
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let client = OpenWeatherClient::with_base_url("TEST_KEY".to_string(), format!("http://{addr}"));
    let err = client
        .fetch_weather(&LocationQuery::by_name("Paris"), UnitSystem::Metric)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::NetworkError);
    assert!(!err.to_string().contains("TEST_KEY"));
}

// ============================================================================
// Session scenarios
// ============================================================================

#[tokio::test]
async fn test_unit_toggle_refetches_by_coordinates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Paris"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paris_body(18.3, 3.1)))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "48.8534"))
        .and(query_param("lon", "2.3488"))
        .and(query_param("units", "imperial"))
        .and(query_param_is_missing("q"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paris_body(64.9, 6.9)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let session = WeatherSession::new(create_test_client(&mock_server), UnitSystem::Metric);
    session.search("Paris").await.expect("search succeeds");

    let refreshed = session.toggle_units().await.expect("a re-fetch was issued");
    let snapshot = refreshed.expect("re-fetch succeeds");

    // Values come from the provider, not from local conversion.
    assert_eq!(snapshot.temperature, 64.9);
    assert_eq!(snapshot.wind_speed, 6.9);
    assert_eq!(session.snapshot().await, Some(snapshot));

    let requests = mock_server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn test_failed_unit_refetch_keeps_snapshot() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("q", "Paris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paris_body(18.3, 3.1)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("units", "imperial"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let session = WeatherSession::new(create_test_client(&mock_server), UnitSystem::Metric);
    let original = session.search("Paris").await.expect("search succeeds");

    let refreshed = session.set_units(UnitSystem::Imperial).await;
    assert!(matches!(refreshed, Some(Err(_))));
    assert_eq!(session.snapshot().await, Some(original));
    assert_eq!(
        session.error().await.as_deref(),
        Some("Unable to fetch weather data")
    );
}

#[tokio::test]
async fn test_coordinate_lookup_rejection_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(serde_json::json!({"cod": "400", "message": "wrong latitude"})),
        )
        .mount(&mock_server)
        .await;

    let session = WeatherSession::new(create_test_client(&mock_server), UnitSystem::Metric);
    let err = session
        .fetch_at(Coordinates::new(48.8534, 2.3488))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::NotFound);
    assert_eq!(err.user_message(), "Unable to fetch weather data");
    assert_eq!(
        session.error().await.as_deref(),
        Some("Unable to fetch weather data")
    );
}

// ============================================================================
// IP geolocation
// ============================================================================

#[tokio::test]
async fn test_ip_location_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ip": "203.0.113.7",
            "city": "Paris",
            "loc": "48.8534,2.3488"
        })))
        .mount(&mock_server)
        .await;

    let provider = IpLocationProvider::with_endpoint(format!("{}/json", mock_server.uri()));
    let coords = provider.current_position().await.expect("position");

    assert_eq!(coords, Coordinates::new(48.8534, 2.3488));
}

#[tokio::test]
async fn test_ip_location_forbidden_is_permission_denied() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let provider = IpLocationProvider::with_endpoint(format!("{}/json", mock_server.uri()));
    let err = provider.current_position().await.unwrap_err();

    assert_eq!(err, LocationError::PermissionDenied);
}

#[tokio::test]
async fn test_session_locate_without_position_makes_no_weather_request() {
    let location_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ip": "10.0.0.1",
            "bogon": true
        })))
        .mount(&location_server)
        .await;

    let weather_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(paris_body(18.3, 3.1)))
        .expect(0)
        .mount(&weather_server)
        .await;

    let provider = IpLocationProvider::with_endpoint(format!("{}/json", location_server.uri()));
    let session = WeatherSession::new(create_test_client(&weather_server), UnitSystem::Metric);

    let err = session.locate(&provider).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::LocationUnavailable);
    assert_eq!(
        session.error().await.as_deref(),
        Some("Geolocation is not supported on this machine")
    );
}

#[tokio::test]
async fn test_ip_location_private_address_is_unsupported() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ip": "192.168.1.20",
            "bogon": true
        })))
        .mount(&mock_server)
        .await;

    let provider = IpLocationProvider::with_endpoint(format!("{}/json", mock_server.uri()));
    let err = provider.current_position().await.unwrap_err();

    assert_eq!(err, LocationError::Unsupported);
}
