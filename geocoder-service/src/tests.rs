use std::sync::Arc;

use ntex::web::{test, App};

use geocoder_fetch::{Geocoder, LoaderConfig};

use super::{deep_healthcheck, healthcheck, max_results_from, parse_points};

#[test]
fn parse_points_pairs_latitude_and_longitude_in_order() {
    let points = parse_points("latitude=48.466&longitude=9.133&latitude=40.4&longitude=-3.7").unwrap();
    assert_eq!(points.len(), 2);
    assert!((points[0].latitude - 48.466).abs() < 1e-9);
    assert!((points[1].longitude - (-3.7)).abs() < 1e-9);
}

#[test]
fn parse_points_rejects_mismatched_counts() {
    let err = parse_points("latitude=1&latitude=2&longitude=1").unwrap_err();
    assert_eq!(err, "latitude/longitude count mismatch");
}

#[test]
fn parse_points_rejects_unparseable_values() {
    let err = parse_points("latitude=not-a-number&longitude=9.0").unwrap_err();
    assert_eq!(err, "invalid latitude/longitude value");
}

#[test]
fn max_results_defaults_to_one() {
    assert_eq!(max_results_from("latitude=1&longitude=1"), 1);
    assert_eq!(max_results_from("latitude=1&longitude=1&maxResults=5"), 5);
}

#[ntex::test]
async fn healthcheck_always_ok() {
    let app = test::init_service(App::new().service(ntex::web::resource("/healthcheck").to(healthcheck)))
        .await;
    let req = test::TestRequest::get().uri("/healthcheck").to_request();
    let resp = ntex::service::Service::call(&app, req).await.unwrap();
    assert_eq!(resp.status(), ntex::http::StatusCode::OK);
}

#[ntex::test]
async fn deep_healthcheck_is_unavailable_before_init() {
    let geocoder = Arc::new(Geocoder::new(LoaderConfig::default()));
    let app = test::init_service(
        App::new()
            .state(geocoder)
            .service(ntex::web::resource("/deep-healthcheck").to(deep_healthcheck)),
    )
    .await;
    let req = test::TestRequest::get().uri("/deep-healthcheck").to_request();
    let resp = ntex::service::Service::call(&app, req).await.unwrap();
    assert_eq!(resp.status(), ntex::http::StatusCode::SERVICE_UNAVAILABLE);
}
