//! Integration tests for the ArcGIS geocoder against a mock GeocodeServer

use serde_json::json;
use std::time::Duration;
use waypoint_engine::config::GeocodingConfig;
use waypoint_engine::geocoding::{ArcGisGeocoder, GeocodeError, Geocoder};
use waypoint_engine::retry::RetryPolicy;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn geocoder(server: &MockServer) -> ArcGisGeocoder {
    ArcGisGeocoder::new(GeocodingConfig {
        base_url: server.uri(),
        max_locations: 5,
        ..GeocodingConfig::default()
    })
    .with_retry_policy(
        RetryPolicy::new(1, Duration::from_secs(5))
            .with_backoff(Duration::from_millis(1), Duration::from_millis(2)),
    )
}

#[tokio::test]
async fn test_find_address_candidates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/findAddressCandidates"))
        .and(query_param("SingleLine", "Eiffel Tower"))
        .and(query_param("f", "json"))
        .and(query_param("maxLocations", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spatialReference": {"wkid": 4326},
            "candidates": [
                {
                    "address": "Tour Eiffel, Paris",
                    "location": {"x": 2.2945, "y": 48.8584},
                    "score": 100,
                    "attributes": {}
                },
                {
                    "address": "Eiffel Tower, Las Vegas",
                    "location": {"x": -115.1723, "y": 36.1125},
                    "score": 88.5
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let candidates = geocoder(&server).geocode("Eiffel Tower").await.unwrap();

    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].name, "Tour Eiffel, Paris");
    assert_eq!(candidates[0].latitude, 48.8584);
    assert_eq!(candidates[0].longitude, 2.2945);
    assert_eq!(candidates[0].confidence, 1.0);
    assert_eq!(candidates[1].confidence, 0.885);
}

#[tokio::test]
async fn test_no_candidates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/findAddressCandidates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let candidates = geocoder(&server).geocode("Atlantis").await.unwrap();
    assert!(candidates.is_empty());
}

#[tokio::test]
async fn test_error_body_is_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/findAddressCandidates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": {"code": 498, "message": "Invalid token", "details": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = geocoder(&server).geocode("Paris").await.unwrap_err();
    match err {
        GeocodeError::Provider(message) => assert!(message.contains("498")),
        other => panic!("Expected provider error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unavailable_service_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/findAddressCandidates"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/findAddressCandidates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"address": "Rome", "location": {"x": 12.4964, "y": 41.9028}, "score": 97}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let candidates = geocoder(&server).geocode("Rome").await.unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].name, "Rome");
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/findAddressCandidates"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let err = geocoder(&server).geocode("Rome").await.unwrap_err();
    assert!(matches!(err, GeocodeError::Http { status: 400 }));
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/findAddressCandidates"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"candidates": []}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let geocoder = geocoder(&server).with_retry_policy(RetryPolicy::new(
        0,
        Duration::from_millis(100),
    ));

    let err = geocoder.geocode("Rome").await.unwrap_err();
    assert!(matches!(err, GeocodeError::Timeout));
}
