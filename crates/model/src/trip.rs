use chrono::{DateTime, Local, TimeZone};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::{
    driver::Driver,
    location::Coordinates,
    stop_point::StopPoint,
    trip_status::{Stage, TripStatus},
    vehicle::Vehicle,
    ExampleData,
};

/// One dispatch job from origin to destination.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    #[serde(default = "TripStatus::unspecified")]
    pub status: TripStatus,
    pub origin: String,
    pub destination: String,
    /// Usually exactly one. Only the first is consulted.
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    /// Stops in the order they must be visited.
    #[serde(default)]
    pub selected_stop_points: Vec<SelectedStop>,
    #[serde(default)]
    pub pickup_schedule: Vec<DateTime<Local>>,
    #[serde(default)]
    pub dropoff_schedule: Vec<DateTime<Local>>,
    /// Greater than zero while an unacknowledged unauthorized stop exists.
    #[serde(default)]
    pub unauthorized_stop_count: u32,
    /// Append-only, most recent last.
    #[serde(default)]
    pub route_points: Vec<RoutePoint>,
    pub status_notes: Option<String>,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

impl HasId for Trip {
    type IdType = String;
}

impl Trip {
    /// A freshly booked trip: pending, unassigned and without stops.
    pub fn new<S: Into<String>>(
        origin: S,
        destination: S,
        created_at: DateTime<Local>,
    ) -> Self {
        Self {
            status: TripStatus::PENDING,
            origin: origin.into(),
            destination: destination.into(),
            assignments: vec![],
            selected_stop_points: vec![],
            pickup_schedule: vec![],
            dropoff_schedule: vec![],
            unauthorized_stop_count: 0,
            route_points: vec![],
            status_notes: None,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        self.assignments.first()
    }

    pub fn last_route_point(&self) -> Option<&RoutePoint> {
        self.route_points.last()
    }

    pub fn pickup(&self) -> Option<&DateTime<Local>> {
        self.pickup_schedule.first()
    }

    pub fn dropoff(&self) -> Option<&DateTime<Local>> {
        self.dropoff_schedule.first()
    }

    pub fn has_violation(&self) -> bool {
        self.unauthorized_stop_count > 0
    }
}

/// The vehicle and crew put on a trip. `drivers[0]` is the primary driver;
/// `drivers[1]`, when present, is the driver taking over during a handover.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub vehicle: Option<Id<Vehicle>>,
    #[serde(default)]
    pub drivers: Vec<Id<Driver>>,
}

impl Assignment {
    pub fn new(vehicle: Option<Id<Vehicle>>, drivers: Vec<Id<Driver>>) -> Self {
        Self { vehicle, drivers }
    }
}

/// A stop picked for a trip: either a reference to a known stop point or an
/// inline custom stop (no `stop_point_id`).
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SelectedStop {
    pub stop_point_id: Option<Id<StopPoint>>,
    pub name: String,
    pub coordinates: Option<Coordinates>,
}

impl SelectedStop {
    pub fn known(id: Id<StopPoint>, stop_point: &StopPoint) -> Self {
        Self {
            stop_point_id: Some(id),
            name: stop_point.name.clone(),
            coordinates: stop_point.coordinates,
        }
    }

    pub fn custom<S: Into<String>>(name: S, coordinates: Option<Coordinates>) -> Self {
        Self {
            stop_point_id: None,
            name: name.into(),
            coordinates,
        }
    }

    pub fn is_custom(&self) -> bool {
        self.stop_point_id.is_none()
    }
}

/// A position sample reported by the vehicle tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoutePoint {
    pub latitude: f64,
    pub longitude: f64,
    pub speed_kmh: f64,
    pub timestamp: DateTime<Local>,
}

impl RoutePoint {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

impl ExampleData for Trip {
    fn example_data() -> Self {
        let booked = Local
            .with_ymd_and_hms(2024, 8, 12, 6, 30, 0)
            .single()
            .unwrap_or_else(Local::now);
        Self {
            status: Stage::OnTrip.into(),
            assignments: vec![Assignment::new(
                Some(Id::new("vehicle-hx42".to_owned())),
                vec![Id::new("driver-thabo".to_owned())],
            )],
            selected_stop_points: vec![SelectedStop::custom(
                "Harrismith weighbridge",
                Some(Coordinates::new(-28.27, 29.12)),
            )],
            pickup_schedule: vec![booked + chrono::Duration::hours(2)],
            dropoff_schedule: vec![booked + chrono::Duration::hours(9)],
            route_points: vec![RoutePoint {
                latitude: -27.65,
                longitude: 28.55,
                speed_kmh: 0.0,
                timestamp: booked + chrono::Duration::hours(4),
            }],
            unauthorized_stop_count: 1,
            ..Self::new("Durban harbour", "Johannesburg City Deep", booked)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sequences_default_to_empty() {
        let trip: Trip = serde_json::from_value(serde_json::json!({
            "status": "On Trip",
            "origin": "Durban",
            "destination": "Johannesburg",
            "createdAt": "2024-08-12T06:30:00+02:00",
            "updatedAt": "2024-08-12T07:00:00+02:00",
        }))
        .unwrap();
        assert_eq!(trip.status, TripStatus::Stage(Stage::OnTrip));
        assert!(trip.assignments.is_empty());
        assert!(trip.selected_stop_points.is_empty());
        assert_eq!(trip.unauthorized_stop_count, 0);
        assert_eq!(trip.last_route_point(), None);
    }

    #[test]
    fn missing_status_reads_as_unspecified() {
        let trip: Trip = serde_json::from_value(serde_json::json!({
            "origin": "Durban",
            "destination": "Johannesburg",
            "createdAt": "2024-08-12T06:30:00+02:00",
            "updatedAt": "2024-08-12T07:00:00+02:00",
        }))
        .unwrap();
        assert_eq!(trip.status, TripStatus::unspecified());
    }

    #[test]
    fn new_trips_are_pending_and_unassigned() {
        let trip = Trip::new("Durban", "Johannesburg", Local::now());
        assert_eq!(trip.status, TripStatus::PENDING);
        assert!(trip.assignment().is_none());
        assert!(!trip.has_violation());
        assert_eq!(trip.created_at, trip.updated_at);
    }
}
