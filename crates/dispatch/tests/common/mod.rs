#![allow(dead_code)]

use std::time::Duration;

use chrono::Local;
use dispatch::{feed::FeedSnapshot, memory::MemoryDatabase};
use model::{
    driver::Driver,
    trip::{Assignment, Trip},
    trip_status::TripStatus,
    WithId,
};
use tokio::sync::watch;
use utility::id::Id;

pub fn driver(name: &str) -> Driver {
    Driver {
        name: name.to_owned(),
        phone: None,
        license_number: None,
    }
}

pub fn trip(status: &str, drivers: &[&str]) -> Trip {
    Trip {
        status: TripStatus::parse(status),
        assignments: vec![Assignment::new(
            Some("truck-1".into()),
            drivers.iter().map(|d| Id::from(*d)).collect(),
        )],
        ..Trip::new("Durban harbour", "City Deep", Local::now())
    }
}

pub async fn seeded() -> (MemoryDatabase, WithId<Trip>) {
    let database = MemoryDatabase::new();
    for name in ["a", "b", "c"] {
        database.put_driver(name, driver(name)).await;
    }
    let trip = database.insert_trip(trip("on-trip", &["a", "b"])).await;
    (database, trip)
}

/// Waits until `predicate` holds for the current snapshot.
pub async fn wait_for<F>(receiver: &mut watch::Receiver<std::sync::Arc<FeedSnapshot>>, predicate: F)
where
    F: Fn(&FeedSnapshot) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if predicate(&receiver.borrow_and_update()) {
                return;
            }
            if receiver.changed().await.is_err() {
                return;
            }
        }
    })
    .await
    .expect("feed did not reach the expected state");
}
