//! Projection of a trip onto the positioned markers of its progress bar.

use model::{
    trip::{SelectedStop, Trip},
    trip_status::{Stage, TripStatus},
};
use schemars::JsonSchema;
use serde::Serialize;

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Waypoint {
    /// Position on the `0..=100` scale.
    pub position: f64,
    pub label: String,
    pub completed: bool,
    pub current: bool,
    pub is_stop: bool,
    /// The lifecycle stage this marker stands for. Unset on stops.
    pub stage: Option<Stage>,
}

pub fn project_waypoints(trip: &Trip) -> Vec<Waypoint> {
    project(&trip.status, &trip.selected_stop_points)
}

/// Lays the stages out evenly over `0..=100` and inserts one marker per stop
/// strictly between `loading` and `on-trip`, in visiting order.
///
/// Stages before `on-trip` keep their base positions whatever the number of
/// stops. The stop block always ends before the base position of `on-trip`,
/// so the stages from `on-trip` onwards keep their even spacing up to 100.
pub fn project(status: &TripStatus, stops: &[SelectedStop]) -> Vec<Waypoint> {
    let current = status.stage();
    let step = 100.0 / (Stage::COUNT - 1) as f64;
    let base_position = |stage: Stage| stage.index() as f64 * step;

    let mut waypoints = Vec::with_capacity(Stage::COUNT + stops.len());
    for stage in Stage::ALL {
        if stage == Stage::OnTrip {
            let start = base_position(Stage::Loading);
            let span = base_position(Stage::OnTrip) - start;
            let stops_done = current.is_some_and(|current| current > Stage::Loading);
            waypoints.extend(stops.iter().enumerate().map(|(j, stop)| Waypoint {
                position: start + (j + 1) as f64 * span / (stops.len() + 1) as f64,
                label: stop.name.clone(),
                completed: stops_done,
                current: false,
                is_stop: true,
                stage: None,
            }));
        }
        waypoints.push(Waypoint {
            position: base_position(stage),
            label: stage.label().to_owned(),
            completed: current.is_some_and(|current| stage < current),
            current: current == Some(stage),
            is_stop: false,
            stage: Some(stage),
        });
    }
    waypoints
}
