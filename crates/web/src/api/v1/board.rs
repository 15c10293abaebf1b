use std::sync::Arc;

use axum::{
    extract::{OriginalUri, State},
    http::Method,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, on, post},
    Json, Router,
};
use chrono::{DateTime, Local};
use dispatch::{
    assignment,
    database::Database,
    feed::FeedSnapshot,
    monitor::{self, BoardSummary, ViolationReport},
    status,
    waypoints::{self, Waypoint},
};
use futures::{Stream, StreamExt};
use model::{
    driver::Driver,
    stop_point::{HighRiskZone, StopPoint},
    trip::{RoutePoint, Trip},
    trip_status::TripStatus,
    vehicle::Vehicle,
    WithId,
};
use schemars::JsonSchema;
use serde::Serialize;
use tokio_stream::wrappers::WatchStream;
use utility::id::Id;

use crate::{
    common::{request_error, route_not_found, schema_no_example, JsonResult, METHOD_FILTER_ALL},
    WebState,
};

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/", get(get_board::<D>))
        .route("/events", get(board_events::<D>))
        .route("/refresh", post(refresh_board::<D>))
        .route("/schema", get(schema_no_example::<BoardDto>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

/// The active board as dispatchers see it.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BoardDto {
    refresh_token: u64,
    fetched_at: Option<DateTime<Local>>,
    /// Set while the latest refresh failed. The trips are then the last good
    /// ones.
    error: Option<String>,
    summary: BoardSummary,
    /// The violation to point the dispatcher at, if nobody is reviewing one.
    candidate: Option<Id<Trip>>,
    reviewing: Option<Id<Trip>>,
    trips: Vec<BoardTripDto>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BoardTripDto {
    id: Id<Trip>,
    status: TripStatus,
    status_label: String,
    origin: String,
    destination: String,
    progress_percent: f64,
    progress: u8,
    driver: Option<Id<Driver>>,
    handover_to: Option<Id<Driver>>,
    vehicle: Option<Id<Vehicle>>,
    unauthorized_stop_count: u32,
    last_seen: Option<RoutePoint>,
    pickup: Option<DateTime<Local>>,
    dropoff: Option<DateTime<Local>>,
    waypoints: Vec<Waypoint>,
    /// Present while the trip has an unacknowledged violation.
    violation: Option<ViolationReport>,
    created_at: DateTime<Local>,
    updated_at: DateTime<Local>,
}

/// The directory records a board build looks violations up against.
#[derive(Debug, Default)]
struct Surroundings {
    stop_points: Vec<WithId<StopPoint>>,
    zones: Vec<WithId<HighRiskZone>>,
}

impl Surroundings {
    /// Missing directory data only costs the violation reports their
    /// context, so failures are logged and the board is still built.
    async fn fetch<D: Database>(state: &WebState<D>) -> Self {
        let stop_points = state
            .client
            .get_stop_points()
            .await
            .unwrap_or_else(|why| {
                log::warn!("Board built without stop points: {}", why);
                vec![]
            });
        let zones = state
            .client
            .get_high_risk_zones()
            .await
            .unwrap_or_else(|why| {
                log::warn!("Board built without high risk zones: {}", why);
                vec![]
            });
        Self { stop_points, zones }
    }
}

impl BoardTripDto {
    fn new(value: &WithId<Trip>, surroundings: &Surroundings) -> Self {
        let trip = &value.content;
        Self {
            id: value.id.clone(),
            status: trip.status.clone(),
            status_label: trip.status.label().into_owned(),
            origin: trip.origin.clone(),
            destination: trip.destination.clone(),
            progress_percent: status::progress_percent(&trip.status),
            progress: status::progress_display(&trip.status),
            driver: assignment::effective_driver(trip).cloned(),
            handover_to: assignment::handover_successor(trip).cloned(),
            vehicle: assignment::effective_vehicle(trip).cloned(),
            unauthorized_stop_count: trip.unauthorized_stop_count,
            last_seen: trip.last_route_point().copied(),
            pickup: trip.pickup().copied(),
            dropoff: trip.dropoff().copied(),
            waypoints: waypoints::project_waypoints(trip),
            violation: monitor::violation_report(
                value,
                &surroundings.stop_points,
                &surroundings.zones,
            ),
            created_at: trip.created_at,
            updated_at: trip.updated_at,
        }
    }
}

/// Builds the board from `snapshot` and lets the monitor see it.
pub(crate) async fn board_view<D: Database>(
    state: &WebState<D>,
    snapshot: &FeedSnapshot,
) -> BoardDto {
    let (candidate, reviewing) = {
        let mut violations = state.monitor.lock().await;
        violations.observe(&snapshot.trips);
        (
            violations.candidate().cloned(),
            violations.selected().cloned(),
        )
    };
    let surroundings = Surroundings::fetch(state).await;
    BoardDto {
        refresh_token: snapshot.refresh_token,
        fetched_at: snapshot.fetched_at,
        error: snapshot.last_error.clone(),
        summary: monitor::board_summary(&snapshot.trips),
        candidate,
        reviewing,
        trips: monitor::sorted_active_trips(&snapshot.trips)
            .iter()
            .map(|trip| BoardTripDto::new(trip, &surroundings))
            .collect(),
    }
}

async fn get_board<D: Database>(State(state): State<WebState<D>>) -> Json<BoardDto> {
    let snapshot = state.feed.snapshot();
    Json(board_view(&state, &snapshot).await)
}

/// Pushes the board every time the feed replaces its snapshot.
async fn board_events<D: Database>(
    State(state): State<WebState<D>>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    log::info!("Board event stream opened");
    let snapshots = WatchStream::new(state.feed.watch());
    let events = snapshots.then(move |snapshot: Arc<FeedSnapshot>| {
        let state = state.clone();
        async move {
            Event::default()
                .event("board")
                .json_data(board_view(&state, &snapshot).await)
        }
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}

/// The explicit "try again" for a failed or stale board.
async fn refresh_board<D: Database>(
    method: Method,
    original_uri: OriginalUri,
    State(state): State<WebState<D>>,
) -> JsonResult<BoardDto> {
    let snapshot = state
        .feed
        .retry()
        .await
        .map_err(request_error(&method, &original_uri))?;
    Ok(Json(board_view(&state, &snapshot).await))
}
