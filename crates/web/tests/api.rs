use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use chrono::{Duration, Local};
use dispatch::memory::MemoryDatabase;
use model::{
    driver::Driver,
    trip::{Assignment, SelectedStop, Trip},
    trip_status::TripStatus,
    WithId,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use utility::id::Id;
use web::{app, WebState};

fn trip(status: &str, drivers: &[&str], minutes_ago: i64) -> Trip {
    Trip {
        status: TripStatus::parse(status),
        assignments: vec![Assignment::new(
            Some("truck-1".into()),
            drivers.iter().map(|d| Id::from(*d)).collect(),
        )],
        ..Trip::new(
            "Durban harbour",
            "City Deep",
            Local::now() - Duration::minutes(minutes_ago),
        )
    }
}

async fn setup() -> (MemoryDatabase, WebState<MemoryDatabase>, WithId<Trip>) {
    let database = MemoryDatabase::new();
    for name in ["a", "b", "c"] {
        let driver = Driver {
            name: name.to_uppercase(),
            phone: None,
            license_number: None,
        };
        database.put_driver(name, driver).await;
    }
    database.insert_trip(trip("pending", &[], 5)).await;
    let violating = database.insert_trip(trip("on-trip", &["a", "b"], 60)).await;
    database.record_unauthorized_stop(&violating.id).await.unwrap();
    let state = WebState::start("test", database.clone()).await.unwrap();
    (database, state, violating)
}

async fn send(
    state: &WebState<MemoryDatabase>,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let body = match body {
        Some(body) => Body::from(body.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = app(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn ping_pongs() {
    let (_, state, _) = setup().await;
    let (status, body) = send(&state, Method::GET, "/api/ping", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "pong!");
}

#[tokio::test]
async fn board_puts_violations_first_and_names_a_candidate() {
    let (_, state, violating) = setup().await;
    let (status, body) = send(&state, Method::GET, "/api/v1/board", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trips"][0]["id"], violating.id.as_str());
    assert_eq!(body["trips"][0]["unauthorizedStopCount"], 1);
    assert_eq!(body["trips"][0]["driver"], "a");
    assert_eq!(body["trips"][0]["progress"], 55);
    assert_eq!(body["candidate"], violating.id.as_str());
    assert_eq!(body["summary"]["active"], 2);
    assert_eq!(body["summary"]["unassigned"], 1);
    assert!(body.get("reviewing").is_none());

    let card = &body["trips"][0];
    let waypoints = card["waypoints"].as_array().unwrap();
    assert_eq!(waypoints.len(), 11);
    assert_eq!(waypoints[5]["stage"], "on-trip");
    assert_eq!(waypoints[5]["current"], true);
    assert_eq!(card["violation"]["tripId"], violating.id.as_str());
    assert_eq!(card["violation"]["count"], 1);
    assert!(body["trips"][1].get("violation").is_none());
    assert_eq!(body["trips"][1]["waypoints"].as_array().unwrap().len(), 11);
}

#[tokio::test]
async fn dismissing_clears_the_board() {
    let (_, state, violating) = setup().await;
    let uri = format!("/api/v1/trips/{}/violation/dismiss", violating.id);
    let (status, body) = send(&state, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unauthorizedStopCount"], 0);

    let (_, board) = send(&state, Method::GET, "/api/v1/board", None).await;
    assert_eq!(board["summary"]["violating"], 0);
    assert!(board.get("candidate").is_none());
}

#[tokio::test]
async fn annotating_requires_a_note() {
    let (_, state, violating) = setup().await;
    let uri = format!("/api/v1/trips/{}/violation/annotate", violating.id);
    let (status, _) = send(&state, Method::POST, &uri, Some(json!({ "note": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let note = json!({ "note": "false alarm, driver on break" });
    let (status, body) = send(&state, Method::POST, &uri, Some(note)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["unauthorizedStopCount"], 0);
    let notes = body["statusNotes"].as_str().unwrap();
    assert!(notes.starts_with("[UNAUTHORIZED STOP]"));
    assert!(notes.ends_with("false alarm, driver on break"));
}

#[tokio::test]
async fn driver_changes_need_confirmation() {
    let (_, state, violating) = setup().await;
    let uri = format!("/api/v1/trips/{}/driver", violating.id);

    let (status, body) =
        send(&state, Method::PUT, &uri, Some(json!({ "driverId": "c" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let preview: Value =
        serde_json::from_str(body["detailedInformation"].as_str().unwrap()).unwrap();
    assert_eq!(preview["discardedSuccessor"], "b");

    let body = json!({ "driverId": "c", "confirmed": true });
    let (status, body) = send(&state, Method::PUT, &uri, Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assignments"][0]["drivers"], json!(["c"]));
}

#[tokio::test]
async fn waypoints_include_selected_stops() {
    let (database, state, _) = setup().await;
    let mut loading = trip("Loading", &["c"], 1);
    loading.selected_stop_points = vec![
        SelectedStop::custom("Weighbridge", None),
        SelectedStop::custom("Fuel", None),
    ];
    let loading = database.insert_trip(loading).await;

    let uri = format!("/api/v1/trips/{}/waypoints", loading.id);
    let (status, body) = send(&state, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "loading");
    let waypoints = body["waypoints"].as_array().unwrap();
    assert_eq!(waypoints.len(), 13);
    assert_eq!(waypoints.iter().filter(|w| w["isStop"] == true).count(), 2);
}

#[tokio::test]
async fn unknown_trips_are_not_found() {
    let (_, state, _) = setup().await;
    let (status, body) = send(&state, Method::GET, "/api/v1/trips/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["requestedUri"], "/api/v1/trips/missing");
}

#[tokio::test]
async fn failed_refresh_is_a_bad_gateway() {
    let (database, state, _) = setup().await;
    database.set_fail_reads(true);
    let (status, _) = send(&state, Method::POST, "/api/v1/board/refresh", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, board) = send(&state, Method::GET, "/api/v1/board", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(board["error"].is_string());
    assert_eq!(board["trips"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_schedules_are_rejected() {
    let (_, state, violating) = setup().await;
    let uri = format!("/api/v1/trips/{}/schedule", violating.id);
    let pickup = Local::now();
    let body = json!({
        "pickup": pickup.to_rfc3339(),
        "dropoff": (pickup - Duration::hours(2)).to_rfc3339(),
    });
    let (status, _) = send(&state, Method::PUT, &uri, Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn idle_drivers_exclude_those_on_active_trips() {
    let (_, state, _) = setup().await;
    let (status, body) = send(&state, Method::GET, "/api/v1/drivers?idle=true", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|driver| driver["id"].as_str().unwrap().to_owned())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["b", "c"]);
}

#[tokio::test]
async fn reviews_open_and_close() {
    let (_, state, violating) = setup().await;
    let uri = format!("/api/v1/trips/{}/review", violating.id);
    let (status, body) = send(&state, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reviewing"], violating.id.as_str());

    let (status, body) = send(&state, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("reviewing").is_none());
    assert_eq!(body["candidate"], violating.id.as_str());
}

#[tokio::test]
async fn violation_report_disappears_once_dismissed() {
    let (_, state, violating) = setup().await;
    let uri = format!("/api/v1/trips/{}/violation", violating.id);
    let (status, body) = send(&state, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);

    let dismiss = format!("{uri}/dismiss");
    send(&state, Method::POST, &dismiss, None).await;
    let (status, _) = send(&state, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn paths_outside_the_api_are_not_found() {
    let (_, state, _) = setup().await;
    let (status, body) = send(&state, Method::GET, "/index.html", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["requestedUri"], "/index.html");
}
