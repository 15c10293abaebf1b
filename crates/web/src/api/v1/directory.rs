use axum::{
    extract::{OriginalUri, Query, State},
    http::Method,
    routing::get,
    Json, Router,
};
use dispatch::database::Database;
use model::{
    driver::Driver,
    stop_point::{HighRiskZone, StopPoint},
    vehicle::Vehicle,
    WithId,
};
use serde::Deserialize;

use crate::{
    common::{request_error, schema, RouteResult, VecResponse},
    WebState,
};

pub(crate) fn routes<D: Database>(state: WebState<D>) -> Router {
    Router::new()
        .route("/drivers", get(get_drivers::<D>))
        .route("/drivers/schema", get(schema::<WithId<Driver>>))
        .route("/vehicles", get(get_vehicles::<D>))
        .route("/vehicles/schema", get(schema::<WithId<Vehicle>>))
        .route("/stop-points", get(get_stop_points::<D>))
        .route("/high-risk-zones", get(get_high_risk_zones::<D>))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DriversQuery {
    /// Only drivers not driving an active trip.
    #[serde(default)]
    idle: bool,
}

async fn get_drivers<D: Database>(
    method: Method,
    original_uri: OriginalUri,
    State(state): State<WebState<D>>,
    Query(params): Query<DriversQuery>,
) -> RouteResult<Json<VecResponse<WithId<Driver>>>> {
    let drivers = if params.idle {
        state.client.get_idle_drivers().await
    } else {
        state.client.get_drivers().await
    };
    drivers
        .map(|drivers| VecResponse::new(drivers).json())
        .map_err(request_error(&method, &original_uri))
}

async fn get_vehicles<D: Database>(
    method: Method,
    original_uri: OriginalUri,
    State(state): State<WebState<D>>,
) -> RouteResult<Json<VecResponse<WithId<Vehicle>>>> {
    state
        .client
        .get_vehicles()
        .await
        .map(|vehicles| VecResponse::new(vehicles).json())
        .map_err(request_error(&method, &original_uri))
}

async fn get_stop_points<D: Database>(
    method: Method,
    original_uri: OriginalUri,
    State(state): State<WebState<D>>,
) -> RouteResult<Json<VecResponse<WithId<StopPoint>>>> {
    state
        .client
        .get_stop_points()
        .await
        .map(|stop_points| VecResponse::new(stop_points).json())
        .map_err(request_error(&method, &original_uri))
}

async fn get_high_risk_zones<D: Database>(
    method: Method,
    original_uri: OriginalUri,
    State(state): State<WebState<D>>,
) -> RouteResult<Json<VecResponse<WithId<HighRiskZone>>>> {
    state
        .client
        .get_high_risk_zones()
        .await
        .map(|zones| VecResponse::new(zones).json())
        .map_err(request_error(&method, &original_uri))
}
