use axum::{
    extract::{OriginalUri, Path, State},
    http::Method,
    routing::{get, on, post, put},
    Json, Router,
};
use chrono::{DateTime, Local};
use dispatch::{
    database::Database,
    monitor::ViolationReport,
    status,
    waypoints::{self, Waypoint},
};
use model::{driver::Driver, trip::Trip, trip_status::TripStatus, WithId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::{
    common::{
        request_error, route_not_found, schema, schema_no_example, JsonResult, METHOD_FILTER_ALL,
    },
    WebState,
};

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/schema", get(schema::<WithId<Trip>>))
        .route("/:id", get(get_trip::<D>))
        .route("/:id/waypoints", get(get_waypoints::<D>))
        .route("/:id/waypoints/schema", get(schema_no_example::<WaypointsDto>))
        .route("/:id/violation", get(get_violation::<D>))
        .route("/:id/violation/dismiss", post(dismiss_violation::<D>))
        .route("/:id/violation/annotate", post(annotate_violation::<D>))
        .route("/:id/review", post(open_review::<D>).delete(close_review::<D>))
        .route("/:id/driver", put(change_driver::<D>))
        .route("/:id/schedule", put(set_schedule::<D>))
        .route("/:id/notes", post(append_note::<D>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Deserialize)]
pub(crate) struct NoteBody {
    note: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DriverChangeBody {
    driver_id: Id<Driver>,
    /// Without it the change is only previewed.
    #[serde(default)]
    confirmed: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleBody {
    #[serde(default)]
    pickup: Option<DateTime<Local>>,
    #[serde(default)]
    dropoff: Option<DateTime<Local>>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WaypointsDto {
    trip_id: Id<Trip>,
    status: TripStatus,
    progress_percent: f64,
    progress: u8,
    waypoints: Vec<Waypoint>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReviewDto {
    reviewing: Option<Id<Trip>>,
    candidate: Option<Id<Trip>>,
}

async fn get_trip<D: Database>(
    method: Method,
    original_uri: OriginalUri,
    State(state): State<WebState<D>>,
    Path(id): Path<String>,
) -> JsonResult<WithId<Trip>> {
    state
        .client
        .get_trip(&Id::new(id))
        .await
        .map(Json)
        .map_err(request_error(&method, &original_uri))
}

async fn get_waypoints<D: Database>(
    method: Method,
    original_uri: OriginalUri,
    State(state): State<WebState<D>>,
    Path(id): Path<String>,
) -> JsonResult<WaypointsDto> {
    let trip = state
        .client
        .get_trip(&Id::new(id))
        .await
        .map_err(request_error(&method, &original_uri))?;
    Ok(Json(WaypointsDto {
        status: trip.content.status.clone(),
        progress_percent: status::progress_percent(&trip.content.status),
        progress: status::progress_display(&trip.content.status),
        waypoints: waypoints::project_waypoints(&trip.content),
        trip_id: trip.id,
    }))
}

async fn get_violation<D: Database>(
    method: Method,
    original_uri: OriginalUri,
    State(state): State<WebState<D>>,
    Path(id): Path<String>,
) -> JsonResult<ViolationReport> {
    state
        .client
        .violation_report(&Id::new(id))
        .await
        .map(Json)
        .map_err(request_error(&method, &original_uri))
}

async fn dismiss_violation<D: Database>(
    method: Method,
    original_uri: OriginalUri,
    State(state): State<WebState<D>>,
    Path(id): Path<String>,
) -> JsonResult<WithId<Trip>> {
    state
        .client
        .dismiss_violation(&Id::new(id))
        .await
        .map(Json)
        .map_err(request_error(&method, &original_uri))
}

async fn annotate_violation<D: Database>(
    method: Method,
    original_uri: OriginalUri,
    State(state): State<WebState<D>>,
    Path(id): Path<String>,
    Json(body): Json<NoteBody>,
) -> JsonResult<WithId<Trip>> {
    state
        .client
        .annotate_and_clear_violation(&Id::new(id), &body.note)
        .await
        .map(Json)
        .map_err(request_error(&method, &original_uri))
}

async fn open_review<D: Database>(
    method: Method,
    original_uri: OriginalUri,
    State(state): State<WebState<D>>,
    Path(id): Path<String>,
) -> JsonResult<ReviewDto> {
    let trip = state
        .client
        .get_trip(&Id::new(id))
        .await
        .map_err(request_error(&method, &original_uri))?;
    let mut monitor = state.monitor.lock().await;
    monitor.open_review(trip.id);
    Ok(Json(ReviewDto {
        reviewing: monitor.selected().cloned(),
        candidate: monitor.candidate().cloned(),
    }))
}

async fn close_review<D: Database>(
    State(state): State<WebState<D>>,
    Path(id): Path<String>,
) -> Json<ReviewDto> {
    let mut monitor = state.monitor.lock().await;
    if monitor.selected().map(Id::as_str) == Some(id.as_str()) {
        monitor.close_review();
    }
    // Let the monitor pick a new candidate right away.
    monitor.observe(&state.feed.current_trips());
    Json(ReviewDto {
        reviewing: monitor.selected().cloned(),
        candidate: monitor.candidate().cloned(),
    })
}

/// Previews the change unless `confirmed` is set. The preview is returned
/// with `409 Conflict`.
async fn change_driver<D: Database>(
    method: Method,
    original_uri: OriginalUri,
    State(state): State<WebState<D>>,
    Path(id): Path<String>,
    Json(body): Json<DriverChangeBody>,
) -> JsonResult<WithId<Trip>> {
    let proposal = state
        .client
        .propose_driver_change(&Id::new(id), body.driver_id)
        .await
        .map_err(request_error(&method, &original_uri))?;
    let preview = serde_json::to_string(&proposal).ok();
    let change = proposal.confirm_if(body.confirmed).map_err(|why| {
        let response = request_error(&method, &original_uri)(why);
        match preview {
            Some(preview) => response.with_detailed_information(preview),
            None => response,
        }
    })?;
    state
        .client
        .change_driver(change)
        .await
        .map(Json)
        .map_err(request_error(&method, &original_uri))
}

async fn set_schedule<D: Database>(
    method: Method,
    original_uri: OriginalUri,
    State(state): State<WebState<D>>,
    Path(id): Path<String>,
    Json(body): Json<ScheduleBody>,
) -> JsonResult<WithId<Trip>> {
    state
        .client
        .set_schedule(&Id::new(id), body.pickup, body.dropoff)
        .await
        .map(Json)
        .map_err(request_error(&method, &original_uri))
}

async fn append_note<D: Database>(
    method: Method,
    original_uri: OriginalUri,
    State(state): State<WebState<D>>,
    Path(id): Path<String>,
    Json(body): Json<NoteBody>,
) -> JsonResult<WithId<Trip>> {
    state
        .client
        .append_note(&Id::new(id), &body.note)
        .await
        .map(Json)
        .map_err(request_error(&method, &original_uri))
}
