//! Integration tests for mbdata-client
//!
//! These tests run the mock provider on a local port and drive a full
//! session over HTTP through the reqwest transport.

use mbdata_client::testing::{MockProvider, Route};
use mbdata_client::{ApiError, MercedesVehicle, VehicleApi, VehicleData};
use pretty_assertions::assert_eq;
use serde_json::json;

const VIN: &str = "WDD1234567890";
const ACCOUNT: &str = "client-id:client-secret";
const INITIAL_TOKEN: &str = "initial-refresh-token";

// =============================================================================
// Test Helpers
// =============================================================================

async fn start_provider() -> MockProvider {
    let provider = MockProvider::start(VIN, INITIAL_TOKEN)
        .await
        .expect("Failed to start mock provider");

    provider.set_listing(json!([
        {"name": "odo", "version": "1.0", "href": "/vehicledata/v1/vehicles/WDD1234567890/resources/odo"},
        {"name": "doorlockstatusvehicle", "version": "1.0"},
        {"name": "rangeelectric", "version": "1.0"}
    ]));
    provider.set_resource("odo", json!({"odo": {"value": "15230", "timestamp": 1600000000000u64}}));
    provider.set_resource(
        "doorlockstatusvehicle",
        json!({"doorlockstatusvehicle": {"value": "2", "timestamp": 1600000000000u64}}),
    );

    provider
}

fn vehicle(provider: &MockProvider, refresh_token: &str) -> MercedesVehicle {
    MercedesVehicle::new(ACCOUNT, refresh_token, VIN, provider.config())
        .expect("Failed to create vehicle session")
}

async fn logged_in(provider: &MockProvider) -> MercedesVehicle {
    let mut v = vehicle(provider, INITIAL_TOKEN);
    v.login().await.expect("Login failed");
    v
}

// =============================================================================
// Authentication Tests
// =============================================================================

#[tokio::test]
async fn test_login_rotates_refresh_token() {
    let provider = start_provider().await;
    let v = logged_in(&provider).await;

    assert_eq!(v.refresh_token(), Some("refresh-1"));
    assert_eq!(provider.refresh_token(), "refresh-1");
    assert_eq!(provider.calls(Route::Token), 1);
}

#[tokio::test]
async fn test_stale_refresh_token_is_rejected() {
    let provider = start_provider().await;
    let _first = logged_in(&provider).await;

    // The initial token was consumed by the first session
    let mut second = vehicle(&provider, INITIAL_TOKEN);
    let result = second.login().await;

    assert_eq!(
        result,
        Err(ApiError::AuthRejected {
            status: 400,
            reauthenticated: false
        })
    );
    assert_eq!(second.refresh_token(), None);
    assert_eq!(provider.calls(Route::Token), 2);
}

#[tokio::test]
async fn test_requests_without_login_fail_locally() {
    let provider = start_provider().await;
    let mut v = vehicle(&provider, INITIAL_TOKEN);

    let result = v.get_vehicle_data().await;

    assert_eq!(result, Err(ApiError::NoCredentials));
    assert_eq!(provider.calls(Route::Container), 0);
}

#[tokio::test]
async fn test_expired_access_token_triggers_single_refresh() {
    let provider = start_provider().await;
    let mut v = logged_in(&provider).await;
    provider.expire_access_token();

    // First listing attempt answers 401 and refreshes, the retry succeeds
    assert_eq!(v.is_awake().await, Ok(true));
    assert_eq!(provider.calls(Route::Token), 2);
    assert_eq!(provider.calls(Route::Resources), 2);
    assert_eq!(v.refresh_token(), Some("refresh-2"));
}

// =============================================================================
// Discovery Tests
// =============================================================================

#[tokio::test]
async fn test_discovery_and_custom_data() {
    let provider = start_provider().await;
    let mut v = logged_in(&provider).await;

    assert_eq!(v.is_awake().await, Ok(true));
    assert_eq!(
        v.catalog().state().field_list(),
        "odo,doorlockstatusvehicle,rangeelectric"
    );

    // rangeelectric answers 404 and is skipped
    let custom = v.get_custom_data().await.unwrap();
    assert_eq!(custom.len(), 2);
    assert_eq!(custom.get("odo").map(|r| (r.id, r.value.as_str())), Some((0, "15230")));
    assert_eq!(
        custom
            .get("doorlockstatusvehicle")
            .map(|r| (r.id, r.value.as_str())),
        Some((1, "2"))
    );
    assert_eq!(provider.calls(Route::Resource), 3);
}

#[tokio::test]
async fn test_unchanged_listing_keeps_fields() {
    let provider = start_provider().await;
    let mut v = logged_in(&provider).await;
    assert_eq!(v.is_awake().await, Ok(true));

    provider.set_listing(json!([
        {"name": "soc"},
        {"name": "tanklevelpercent"},
        {"name": "rangeliquid"}
    ]));

    assert_eq!(v.is_awake().await, Ok(true));
    assert_eq!(
        v.catalog().state().field_list(),
        "odo,doorlockstatusvehicle,rangeelectric"
    );
}

#[tokio::test]
async fn test_listing_without_names_is_not_awake() {
    let provider = start_provider().await;
    provider.set_listing(json!([{"version": "1.0"}, {"href": "somewhere"}]));
    let mut v = logged_in(&provider).await;

    assert_eq!(v.is_awake().await, Ok(false));
    assert!(v.catalog().is_empty());
}

#[tokio::test]
async fn test_rate_limited_listing_is_retried() {
    let provider = start_provider().await;
    let mut v = logged_in(&provider).await;
    provider.force_status(429);
    provider.force_status(503);

    assert_eq!(v.is_awake().await, Ok(true));
    assert_eq!(provider.calls(Route::Resources), 3);
}

#[tokio::test]
async fn test_listing_gives_up_after_attempts() {
    let provider = start_provider().await;
    let mut v = logged_in(&provider).await;
    for _ in 0..4 {
        provider.force_status(429);
    }

    assert_eq!(v.is_awake().await, Err(ApiError::RateLimited));
    assert_eq!(provider.calls(Route::Resources), 4);
}

// =============================================================================
// Vehicle Data Tests
// =============================================================================

#[tokio::test]
async fn test_vehicle_data() {
    let provider = start_provider().await;
    provider.set_container(
        "vehiclelockstatus",
        json!([
            {"doorlockstatusvehicle": {"value": "0", "timestamp": 1}},
            {"doorstatusfrontleft": {"value": "false", "timestamp": 1}}
        ]),
    );
    provider.set_container(
        "payasyoudrive",
        json!([{"odo": {"value": 15230, "timestamp": 1}}]),
    );
    let mut v = logged_in(&provider).await;

    let data = v.get_vehicle_data().await.unwrap();
    assert_eq!(
        data,
        VehicleData {
            odo: 15230.0,
            car_open: true,
            car_open_message: "Your Mercedes is open".to_string(),
        }
    );
}

#[tokio::test]
async fn test_vehicle_data_without_activity() {
    let provider = start_provider().await;
    let mut v = logged_in(&provider).await;

    // No containers configured: both answer 204
    assert_eq!(v.get_vehicle_data().await, Ok(VehicleData::default()));
    assert_eq!(provider.calls(Route::Container), 2);
}

#[tokio::test]
async fn test_full_snapshot() {
    let provider = start_provider().await;
    provider.set_container(
        "vehiclelockstatus",
        json!([{"doorlockstatusvehicle": {"value": "1"}}]),
    );
    let mut v = logged_in(&provider).await;
    assert_eq!(v.is_awake().await, Ok(true));

    let all = v.get_all_data().await.unwrap();
    assert!(!all.vehicle.car_open);
    assert_eq!(all.custom.len(), 2);
}
