//! Unauthorized stop surfacing.

use std::cmp::Reverse;

use chrono::{DateTime, Local};
use itertools::Itertools;
use model::{
    location::Coordinates,
    stop_point::{HighRiskZone, StopPoint},
    trip::{RoutePoint, Trip},
    trip_status::{Stage, TripStatus},
    WithId,
};
use schemars::JsonSchema;
use serde::Serialize;
use utility::id::Id;

use crate::{assignment, status};

pub const UNAUTHORIZED_STOP_TAG: &str = "[UNAUTHORIZED STOP]";

/// The active board: trips with violations first (highest count first), then
/// newest first.
pub fn sorted_active_trips(trips: &[WithId<Trip>]) -> Vec<WithId<Trip>> {
    trips
        .iter()
        .filter(|trip| status::is_active(&trip.content.status))
        .sorted_by_key(|trip| {
            (
                Reverse(trip.content.unauthorized_stop_count),
                Reverse(trip.content.created_at),
            )
        })
        .cloned()
        .collect()
}

/// The most recently updated active trip with an unacknowledged violation.
pub fn latest_violation(trips: &[WithId<Trip>]) -> Option<&WithId<Trip>> {
    trips
        .iter()
        .filter(|trip| status::is_active(&trip.content.status))
        .filter(|trip| trip.content.has_violation())
        .max_by_key(|trip| trip.content.updated_at)
}

/// Tracks which violating trip the dispatcher is looking at.
///
/// Surfacing is passive: [`ViolationMonitor::observe`] only ever sets a
/// candidate. A review is opened explicitly and is released once its trip
/// is cleared or leaves the board.
#[derive(Debug, Clone, Default)]
pub struct ViolationMonitor {
    selected: Option<Id<Trip>>,
    candidate: Option<Id<Trip>>,
}

impl ViolationMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&Id<Trip>> {
        self.selected.as_ref()
    }

    pub fn candidate(&self) -> Option<&Id<Trip>> {
        self.candidate.as_ref()
    }

    /// Feeds a fresh snapshot of the trip set.
    pub fn observe(&mut self, trips: &[WithId<Trip>]) {
        if let Some(selected) = &self.selected {
            let still_violating = trips.iter().any(|trip| {
                &trip.id == selected
                    && trip.content.has_violation()
                    && status::is_active(&trip.content.status)
            });
            if !still_violating {
                log::debug!("Releasing review of trip {}", selected);
                self.selected = None;
            }
        }
        if self.selected.is_none() {
            self.candidate = latest_violation(trips).map(|trip| trip.id.clone());
        }
    }

    pub fn open_review(&mut self, trip_id: Id<Trip>) {
        if self.candidate.as_ref() == Some(&trip_id) {
            self.candidate = None;
        }
        self.selected = Some(trip_id);
    }

    pub fn close_review(&mut self) -> Option<Id<Trip>> {
        self.selected.take()
    }
}

/// `existing` followed by a tagged entry for `note`.
pub fn annotated_notes(existing: Option<&str>, note: &str, at: DateTime<Local>) -> String {
    let entry = format!(
        "{} {}: {}",
        UNAUTHORIZED_STOP_TAG,
        at.format("%Y-%m-%d %H:%M:%S"),
        note.trim()
    );
    match existing {
        Some(existing) if !existing.is_empty() => format!("{existing}\n{entry}"),
        _ => entry,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct NearestStop {
    pub name: String,
    pub distance_km: f64,
}

/// Context shown next to a violation.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ViolationReport {
    pub trip_id: Id<Trip>,
    pub count: u32,
    pub last_seen: Option<RoutePoint>,
    /// Names of the high risk zones containing the last position.
    pub zones: Vec<String>,
    /// Whether the last position lies inside a known stop point.
    pub within_stop_point: bool,
    /// The closest of the trip's selected stops that has coordinates.
    pub nearest_stop: Option<NearestStop>,
}

/// `None` unless the trip has an unacknowledged violation.
pub fn violation_report(
    trip: &WithId<Trip>,
    stop_points: &[WithId<StopPoint>],
    zones: &[WithId<HighRiskZone>],
) -> Option<ViolationReport> {
    if !trip.content.has_violation() {
        return None;
    }
    let last_seen = trip.content.last_route_point().copied();
    let position = last_seen.as_ref().map(RoutePoint::coordinates);
    let zones: Vec<String> = position
        .map(|position| {
            zones
                .iter()
                .filter(|zone| zone.content.contains(&position))
                .map(|zone| zone.content.name.clone())
                .collect()
        })
        .unwrap_or_default();
    let within_stop_point = position.is_some_and(|position| {
        stop_points
            .iter()
            .any(|stop_point| stop_point.content.contains(&position))
    });
    let nearest_stop =
        position.and_then(|position| nearest_selected_stop(&trip.content, &position));
    Some(ViolationReport {
        trip_id: trip.id.clone(),
        count: trip.content.unauthorized_stop_count,
        last_seen,
        zones,
        within_stop_point,
        nearest_stop,
    })
}

fn nearest_selected_stop(trip: &Trip, position: &Coordinates) -> Option<NearestStop> {
    trip.selected_stop_points
        .iter()
        .filter_map(|stop| {
            stop.coordinates.map(|coordinates| NearestStop {
                name: stop.name.clone(),
                distance_km: coordinates.distance_km(position),
            })
        })
        .min_by(|a, b| a.distance_km.total_cmp(&b.distance_km))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub active: usize,
    pub violating: usize,
    pub unassigned: usize,
    pub delivered: usize,
    pub terminated: usize,
}

pub fn board_summary(trips: &[WithId<Trip>]) -> BoardSummary {
    trips
        .iter()
        .fold(BoardSummary::default(), |mut summary, trip| {
            let trip = &trip.content;
            match &trip.status {
                TripStatus::Stage(Stage::Delivered) => summary.delivered += 1,
                TripStatus::Terminated(_) => summary.terminated += 1,
                _ => {
                    summary.active += 1;
                    if trip.has_violation() {
                        summary.violating += 1;
                    }
                    if assignment::effective_driver(trip).is_none() {
                        summary.unassigned += 1;
                    }
                }
            }
            summary
        })
}
