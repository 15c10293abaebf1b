use chrono::{DateTime, Local};
use model::{
    driver::Driver,
    stop_point::{HighRiskZone, StopPoint},
    trip::Trip,
    vehicle::Vehicle,
    WithId,
};
use utility::id::Id;

use crate::{
    assignment::{self, ConfirmedDriverChange, DriverChangeProposal},
    database::{Database, TripPatch},
    feed::TripFeed,
    monitor::{self, ViolationReport},
    RequestError, RequestResult,
};

/// Dispatcher operations against the store.
///
/// Writes are never applied locally: the returned trip is what the store
/// confirmed, and the attached feed (if any) is refreshed afterwards.
#[derive(Debug, Clone)]
pub struct Client<D>
where
    D: Database,
{
    id: String,
    pub database: D,
    feed: Option<TripFeed>,
}

impl<D> Client<D>
where
    D: Database,
{
    pub fn new<S>(id: S, database: D) -> Self
    where
        S: Into<String>,
    {
        Self {
            id: id.into(),
            database,
            feed: None,
        }
    }

    pub fn with_feed(self, feed: TripFeed) -> Self {
        Self {
            feed: Some(feed),
            ..self
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn feed(&self) -> Option<&TripFeed> {
        self.feed.as_ref()
    }

    pub async fn get_trips(&self) -> RequestResult<Vec<WithId<Trip>>> {
        Ok(self.database.list_trips().await?)
    }

    pub async fn get_trip(&self, id: &Id<Trip>) -> RequestResult<WithId<Trip>> {
        Ok(self.database.get_trip(id).await?)
    }

    pub async fn get_drivers(&self) -> RequestResult<Vec<WithId<Driver>>> {
        Ok(self.database.list_drivers().await?)
    }

    pub async fn get_idle_drivers(&self) -> RequestResult<Vec<WithId<Driver>>> {
        let drivers = self.get_drivers().await?;
        let trips = match &self.feed {
            Some(feed) => feed.current_trips().as_ref().clone(),
            None => self.get_trips().await?,
        };
        Ok(assignment::idle_drivers(
            trips.iter().map(|trip| &trip.content),
            drivers,
        ))
    }

    pub async fn get_vehicles(&self) -> RequestResult<Vec<WithId<Vehicle>>> {
        Ok(self.database.list_vehicles().await?)
    }

    pub async fn get_stop_points(&self) -> RequestResult<Vec<WithId<StopPoint>>> {
        Ok(self.database.list_stop_points().await?)
    }

    pub async fn get_high_risk_zones(&self) -> RequestResult<Vec<WithId<HighRiskZone>>> {
        Ok(self.database.list_high_risk_zones().await?)
    }

    /// Fails with [`RequestError::NotFound`] when the trip has no
    /// unacknowledged violation.
    pub async fn violation_report(&self, id: &Id<Trip>) -> RequestResult<ViolationReport> {
        let trip = self.get_trip(id).await?;
        let stop_points = self.get_stop_points().await?;
        let zones = self.get_high_risk_zones().await?;
        monitor::violation_report(&trip, &stop_points, &zones).ok_or(RequestError::NotFound)
    }

    /// Acknowledges a violation without a note.
    pub async fn dismiss_violation(&self, id: &Id<Trip>) -> RequestResult<WithId<Trip>> {
        let patch = TripPatch {
            unauthorized_stop_count: Some(0),
            ..Default::default()
        };
        self.write(id, patch, "dismiss violation").await
    }

    /// Appends a tagged note to the trip's log and acknowledges the
    /// violation in the same write.
    pub async fn annotate_and_clear_violation(
        &self,
        id: &Id<Trip>,
        note: &str,
    ) -> RequestResult<WithId<Trip>> {
        if note.trim().is_empty() {
            return Err(RequestError::EmptyNote);
        }
        let trip = self.get_trip(id).await?;
        let notes = monitor::annotated_notes(
            trip.content.status_notes.as_deref(),
            note,
            Local::now(),
        );
        let patch = TripPatch {
            unauthorized_stop_count: Some(0),
            status_notes: Some(notes),
            ..Default::default()
        };
        self.write(id, patch, "annotate violation").await
    }

    /// First half of a driver change. Nothing is written until the returned
    /// proposal is confirmed and passed to [`Client::change_driver`].
    pub async fn propose_driver_change(
        &self,
        id: &Id<Trip>,
        driver: Id<Driver>,
    ) -> RequestResult<DriverChangeProposal> {
        let trip = self.get_trip(id).await?;
        let known = self
            .get_drivers()
            .await?
            .iter()
            .any(|candidate| candidate.id == driver);
        if !known {
            return Err(RequestError::NotFound);
        }
        Ok(DriverChangeProposal::new(trip.id, &trip.content, driver))
    }

    /// Puts the proposed driver in sole charge of the trip.
    pub async fn change_driver(
        &self,
        change: ConfirmedDriverChange,
    ) -> RequestResult<WithId<Trip>> {
        let trip = self.get_trip(change.trip_id()).await?;
        let patch = TripPatch {
            assignments: Some(assignment::reassigned(
                &trip.content.assignments,
                change.replacement().clone(),
            )),
            ..Default::default()
        };
        self.write(change.trip_id(), patch, "change driver").await
    }

    /// Sets either end of the schedule. A dropoff before the pickup, after
    /// merging with the stored schedule, is rejected.
    pub async fn set_schedule(
        &self,
        id: &Id<Trip>,
        pickup: Option<DateTime<Local>>,
        dropoff: Option<DateTime<Local>>,
    ) -> RequestResult<WithId<Trip>> {
        let trip = self.get_trip(id).await?;
        let effective_pickup = pickup.or_else(|| trip.content.pickup().copied());
        let effective_dropoff = dropoff.or_else(|| trip.content.dropoff().copied());
        if let (Some(pickup), Some(dropoff)) = (effective_pickup, effective_dropoff) {
            if dropoff < pickup {
                return Err(RequestError::InvalidSchedule { pickup, dropoff });
            }
        }
        let patch = TripPatch {
            pickup_schedule: pickup.map(|pickup| vec![pickup]),
            dropoff_schedule: dropoff.map(|dropoff| vec![dropoff]),
            ..Default::default()
        };
        if patch.is_empty() {
            return Ok(trip);
        }
        self.write(id, patch, "set schedule").await
    }

    /// Appends a timestamped entry to the trip's note log.
    pub async fn append_note(&self, id: &Id<Trip>, note: &str) -> RequestResult<WithId<Trip>> {
        let note = note.trim();
        if note.is_empty() {
            return Err(RequestError::EmptyNote);
        }
        let trip = self.get_trip(id).await?;
        let entry = format!("[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), note);
        let notes = match trip.content.status_notes.as_deref() {
            Some(existing) if !existing.is_empty() => format!("{existing}\n{entry}"),
            _ => entry,
        };
        let patch = TripPatch {
            status_notes: Some(notes),
            ..Default::default()
        };
        self.write(id, patch, "append note").await
    }

    async fn write(
        &self,
        id: &Id<Trip>,
        patch: TripPatch,
        action: &str,
    ) -> RequestResult<WithId<Trip>> {
        let updated = self.database.update_trip(id, patch).await.map_err(|why| {
            log::warn!("[{}] Failed to {} on trip {}: {}", self.id, action, id, why);
            RequestError::from(why)
        })?;
        log::debug!("[{}] {} on trip {}", self.id, action, id);
        if let Some(feed) = &self.feed {
            if let Err(why) = feed.bump_refresh().await {
                log::warn!("[{}] Refresh after {} failed: {}", self.id, action, why);
            }
        }
        Ok(updated)
    }
}
