use std::{error, result, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use model::{
    driver::Driver,
    stop_point::{HighRiskZone, StopPoint},
    trip::{Assignment, Trip},
    vehicle::Vehicle,
    WithId,
};
use tokio::task::JoinHandle;
use utility::id::Id;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("record not found")]
    NotFound,
    #[error("invalid record: {0}")]
    InvalidRecord(String),
    #[error(transparent)]
    Other(Box<dyn error::Error + Send + Sync>),
}

impl DatabaseError {
    pub fn other<E: error::Error + Send + Sync + 'static>(why: E) -> Self {
        Self::Other(Box::new(why))
    }
}

pub type Result<T> = result::Result<T, DatabaseError>;

#[async_trait]
pub trait TripRepo: Send + Sync {
    async fn list_trips(&self) -> Result<Vec<WithId<Trip>>>;
    async fn get_trip(&self, id: &Id<Trip>) -> Result<WithId<Trip>>;

    /// Writes the fields set in `patch` and returns the stored record.
    /// Bumps `updated_at`.
    async fn update_trip(&self, id: &Id<Trip>, patch: TripPatch) -> Result<WithId<Trip>>;
}

#[async_trait]
pub trait DirectoryRepo: Send + Sync {
    async fn list_drivers(&self) -> Result<Vec<WithId<Driver>>>;
    async fn list_vehicles(&self) -> Result<Vec<WithId<Vehicle>>>;
    async fn list_stop_points(&self) -> Result<Vec<WithId<StopPoint>>>;
    async fn list_high_risk_zones(&self) -> Result<Vec<WithId<HighRiskZone>>>;
}

#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Calls `on_change` for every insert, update or delete on trip records
    /// until the returned subscription is dropped or unsubscribed.
    async fn subscribe_trip_changes(&self, on_change: OnChange) -> Result<Subscription>;
}

pub trait Database:
    TripRepo + DirectoryRepo + ChangeFeed + Clone + Send + Sync + 'static
{
}

impl<T> Database for T where
    T: TripRepo + DirectoryRepo + ChangeFeed + Clone + Send + Sync + 'static
{
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    Unknown,
}

impl ChangeKind {
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "INSERT" => Self::Insert,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripChange {
    pub kind: ChangeKind,
    pub trip_id: Option<Id<Trip>>,
}

impl TripChange {
    pub fn new(kind: ChangeKind, trip_id: Option<Id<Trip>>) -> Self {
        Self { kind, trip_id }
    }
}

pub type OnChange = Arc<dyn Fn(TripChange) + Send + Sync>;

/// A live change subscription. Dropping it tears the listener down.
#[derive(Debug)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn unsubscribe(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}

/// A partial trip update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripPatch {
    pub unauthorized_stop_count: Option<u32>,
    pub status_notes: Option<String>,
    pub assignments: Option<Vec<Assignment>>,
    pub pickup_schedule: Option<Vec<DateTime<Local>>>,
    pub dropoff_schedule: Option<Vec<DateTime<Local>>>,
}

impl TripPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply(self, trip: &mut Trip) {
        if let Some(count) = self.unauthorized_stop_count {
            trip.unauthorized_stop_count = count;
        }
        if let Some(notes) = self.status_notes {
            trip.status_notes = Some(notes);
        }
        if let Some(assignments) = self.assignments {
            trip.assignments = assignments;
        }
        if let Some(pickup) = self.pickup_schedule {
            trip.pickup_schedule = pickup;
        }
        if let Some(dropoff) = self.dropoff_schedule {
            trip.dropoff_schedule = dropoff;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::ExampleData;

    #[test]
    fn empty_patch_leaves_trip_untouched() {
        let mut trip = Trip::example_data();
        let before = trip.clone();
        let patch = TripPatch::default();
        assert!(patch.is_empty());
        patch.apply(&mut trip);
        assert_eq!(trip, before);
    }

    #[test]
    fn patch_overwrites_only_set_fields() {
        let mut trip = Trip::example_data();
        let notes = trip.status_notes.clone();
        TripPatch {
            unauthorized_stop_count: Some(0),
            ..Default::default()
        }
        .apply(&mut trip);
        assert_eq!(trip.unauthorized_stop_count, 0);
        assert_eq!(trip.status_notes, notes);
        assert_eq!(trip.assignments.len(), 1);
    }

    #[test]
    fn change_kinds_parse_trigger_operations() {
        assert_eq!(ChangeKind::parse("INSERT"), ChangeKind::Insert);
        assert_eq!(ChangeKind::parse("update"), ChangeKind::Update);
        assert_eq!(ChangeKind::parse("DELETE"), ChangeKind::Delete);
        assert_eq!(ChangeKind::parse("TRUNCATE"), ChangeKind::Unknown);
    }
}
