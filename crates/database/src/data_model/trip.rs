use chrono::{DateTime, Local};
use model::{
    trip::{Assignment, RoutePoint, SelectedStop, Trip},
    trip_status::TripStatus,
};
use sqlx::{prelude::FromRow, types::Json};
use utility::id::Id;

use super::DatabaseRow;

#[derive(Debug, Clone, FromRow)]
pub struct TripRow {
    pub id: String,
    pub status: Option<String>,
    pub origin: String,
    pub destination: String,
    pub assignments: Json<Vec<Assignment>>,
    pub selected_stop_points: Json<Vec<SelectedStop>>,
    pub pickup_schedule: Json<Vec<DateTime<Local>>>,
    pub dropoff_schedule: Json<Vec<DateTime<Local>>>,
    pub unauthorized_stop_count: i32,
    pub route_points: Json<Vec<RoutePoint>>,
    pub status_notes: Option<String>,
    pub created_at: DateTime<Local>,
    pub updated_at: DateTime<Local>,
}

impl DatabaseRow for TripRow {
    type Model = Trip;

    fn get_id(&self) -> Id<Self::Model> {
        Id::new(self.id.clone())
    }

    fn to_model(self) -> Self::Model {
        Trip {
            // Stored statuses predate the canonical format, so they are
            // normalized here and nowhere else.
            status: self
                .status
                .as_deref()
                .map(TripStatus::parse)
                .unwrap_or_else(TripStatus::unspecified),
            origin: self.origin,
            destination: self.destination,
            assignments: self.assignments.0,
            selected_stop_points: self.selected_stop_points.0,
            pickup_schedule: self.pickup_schedule.0,
            dropoff_schedule: self.dropoff_schedule.0,
            unauthorized_stop_count: u32::try_from(self.unauthorized_stop_count).unwrap_or(0),
            route_points: self.route_points.0,
            status_notes: self.status_notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::trip_status::Stage;
    use rstest::rstest;

    fn row(status: Option<&str>) -> TripRow {
        let now = Local::now();
        TripRow {
            id: "trip-1".to_owned(),
            status: status.map(str::to_owned),
            origin: "Durban".to_owned(),
            destination: "Johannesburg".to_owned(),
            assignments: Json(vec![]),
            selected_stop_points: Json(vec![]),
            pickup_schedule: Json(vec![]),
            dropoff_schedule: Json(vec![]),
            unauthorized_stop_count: 2,
            route_points: Json(vec![]),
            status_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    #[case(Some("On Trip"), TripStatus::Stage(Stage::OnTrip))]
    #[case(Some("on_trip"), TripStatus::Stage(Stage::OnTrip))]
    #[case(Some("Arrived at Loading"), TripStatus::Stage(Stage::ArrivedAtLoading))]
    #[case(None, TripStatus::unspecified())]
    fn statuses_are_normalized_on_read(
        #[case] stored: Option<&str>,
        #[case] expected: TripStatus,
    ) {
        let trip = row(stored).to_model();
        assert_eq!(trip.status, expected);
        assert_eq!(trip.unauthorized_stop_count, 2);
    }
}
