//! An in-process store, used for tests and for running the board without
//! Postgres.

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use chrono::Local;
use indexmap::IndexMap;
use model::{
    driver::Driver,
    stop_point::{HighRiskZone, StopPoint},
    trip::{RoutePoint, Trip},
    trip_status::TripStatus,
    vehicle::Vehicle,
    WithId,
};
use tokio::sync::{broadcast, RwLock};
use utility::id::{HasId, Id};

use crate::database::{
    ChangeFeed, ChangeKind, DatabaseError, DirectoryRepo, OnChange, Result, Subscription,
    TripChange, TripPatch, TripRepo,
};

#[derive(Debug)]
struct Tables {
    trips: IndexMap<Id<Trip>, Trip>,
    drivers: IndexMap<Id<Driver>, Driver>,
    vehicles: IndexMap<Id<Vehicle>, Vehicle>,
    stop_points: IndexMap<Id<StopPoint>, StopPoint>,
    zones: IndexMap<Id<HighRiskZone>, HighRiskZone>,
}

#[derive(Debug)]
struct Inner {
    tables: RwLock<Tables>,
    changes: broadcast::Sender<TripChange>,
    next_id: AtomicU64,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    notifications: AtomicBool,
}

#[derive(Debug, Clone)]
pub struct MemoryDatabase {
    inner: Arc<Inner>,
}

#[derive(Debug, thiserror::Error)]
#[error("simulated storage failure")]
pub struct SimulatedFailure;

impl Default for MemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                tables: RwLock::new(Tables {
                    trips: IndexMap::new(),
                    drivers: IndexMap::new(),
                    vehicles: IndexMap::new(),
                    stop_points: IndexMap::new(),
                    zones: IndexMap::new(),
                }),
                changes,
                next_id: AtomicU64::new(1),
                fail_reads: AtomicBool::new(false),
                fail_writes: AtomicBool::new(false),
                notifications: AtomicBool::new(true),
            }),
        }
    }

    /// Makes every read fail until switched off again.
    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every trip write fail until switched off again.
    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Turns change notifications off, as with a store whose push channel
    /// is down.
    pub fn set_notifications(&self, enabled: bool) {
        self.inner.notifications.store(enabled, Ordering::SeqCst);
    }

    pub async fn insert_trip(&self, trip: Trip) -> WithId<Trip> {
        let id = self.fresh_id();
        self.put_trip(id, trip).await
    }

    pub async fn put_trip(&self, id: Id<Trip>, trip: Trip) -> WithId<Trip> {
        let previous = self
            .inner
            .tables
            .write()
            .await
            .trips
            .insert(id.clone(), trip.clone());
        let kind = match previous {
            Some(_) => ChangeKind::Update,
            None => ChangeKind::Insert,
        };
        self.notify(kind, &id);
        WithId::new(id, trip)
    }

    pub async fn remove_trip(&self, id: &Id<Trip>) -> Option<Trip> {
        let removed = self.inner.tables.write().await.trips.shift_remove(id);
        if removed.is_some() {
            self.notify(ChangeKind::Delete, id);
        }
        removed
    }

    pub async fn put_driver(&self, id: &str, driver: Driver) {
        self.inner.tables.write().await.drivers.insert(id.into(), driver);
    }

    pub async fn put_vehicle(&self, id: &str, vehicle: Vehicle) {
        self.inner.tables.write().await.vehicles.insert(id.into(), vehicle);
    }

    pub async fn put_stop_point(&self, id: &str, stop_point: StopPoint) {
        self.inner
            .tables
            .write()
            .await
            .stop_points
            .insert(id.into(), stop_point);
    }

    pub async fn put_zone(&self, id: &str, zone: HighRiskZone) {
        self.inner.tables.write().await.zones.insert(id.into(), zone);
    }

    /// An upstream status change, as made by a driver's device.
    pub async fn set_status(&self, id: &Id<Trip>, status: TripStatus) -> Result<()> {
        self.modify(id, |trip| trip.status = status).await
    }

    pub async fn push_route_point(&self, id: &Id<Trip>, point: RoutePoint) -> Result<()> {
        self.modify(id, |trip| trip.route_points.push(point)).await
    }

    /// An upstream violation report.
    pub async fn record_unauthorized_stop(&self, id: &Id<Trip>) -> Result<()> {
        self.modify(id, |trip| {
            trip.unauthorized_stop_count = trip.unauthorized_stop_count.saturating_add(1)
        })
        .await
    }

    async fn modify<F>(&self, id: &Id<Trip>, change: F) -> Result<()>
    where
        F: FnOnce(&mut Trip),
    {
        {
            let mut tables = self.inner.tables.write().await;
            let trip = tables.trips.get_mut(id).ok_or(DatabaseError::NotFound)?;
            change(trip);
            trip.updated_at = Local::now();
        }
        self.notify(ChangeKind::Update, id);
        Ok(())
    }

    fn fresh_id(&self) -> Id<Trip> {
        let n = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        Id::new(format!("trip-{n}"))
    }

    fn notify(&self, kind: ChangeKind, id: &Id<Trip>) {
        if self.inner.notifications.load(Ordering::SeqCst) {
            // No receivers is fine.
            let _ = self.inner.changes.send(TripChange::new(kind, Some(id.clone())));
        }
    }

    fn check_reads(&self) -> Result<()> {
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            Err(DatabaseError::other(SimulatedFailure))
        } else {
            Ok(())
        }
    }
}

fn with_ids<T>(table: &IndexMap<Id<T>, T>) -> Vec<WithId<T>>
where
    T: HasId<IdType = String> + Clone,
{
    table
        .iter()
        .map(|(id, value)| WithId::new(id.clone(), value.clone()))
        .collect()
}

#[async_trait]
impl TripRepo for MemoryDatabase {
    async fn list_trips(&self) -> Result<Vec<WithId<Trip>>> {
        self.check_reads()?;
        Ok(with_ids(&self.inner.tables.read().await.trips))
    }

    async fn get_trip(&self, id: &Id<Trip>) -> Result<WithId<Trip>> {
        self.check_reads()?;
        self.inner
            .tables
            .read()
            .await
            .trips
            .get(id)
            .map(|trip| WithId::new(id.clone(), trip.clone()))
            .ok_or(DatabaseError::NotFound)
    }

    async fn update_trip(&self, id: &Id<Trip>, patch: TripPatch) -> Result<WithId<Trip>> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(DatabaseError::other(SimulatedFailure));
        }
        let updated = {
            let mut tables = self.inner.tables.write().await;
            let trip = tables.trips.get_mut(id).ok_or(DatabaseError::NotFound)?;
            patch.apply(trip);
            trip.updated_at = Local::now();
            WithId::new(id.clone(), trip.clone())
        };
        self.notify(ChangeKind::Update, id);
        Ok(updated)
    }
}

#[async_trait]
impl DirectoryRepo for MemoryDatabase {
    async fn list_drivers(&self) -> Result<Vec<WithId<Driver>>> {
        self.check_reads()?;
        Ok(with_ids(&self.inner.tables.read().await.drivers))
    }

    async fn list_vehicles(&self) -> Result<Vec<WithId<Vehicle>>> {
        self.check_reads()?;
        Ok(with_ids(&self.inner.tables.read().await.vehicles))
    }

    async fn list_stop_points(&self) -> Result<Vec<WithId<StopPoint>>> {
        self.check_reads()?;
        Ok(with_ids(&self.inner.tables.read().await.stop_points))
    }

    async fn list_high_risk_zones(&self) -> Result<Vec<WithId<HighRiskZone>>> {
        self.check_reads()?;
        Ok(with_ids(&self.inner.tables.read().await.zones))
    }
}

#[async_trait]
impl ChangeFeed for MemoryDatabase {
    async fn subscribe_trip_changes(&self, on_change: OnChange) -> Result<Subscription> {
        let mut changes = self.inner.changes.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => on_change(change),
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        on_change(TripChange::new(ChangeKind::Unknown, None))
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Ok(Subscription::new(task))
    }
}
