mod common;

use dispatch::{database::TripRepo, feed::TripFeed, RequestError};
use model::trip_status::Stage;

use common::{seeded, trip, wait_for};

#[tokio::test]
async fn initial_snapshot_holds_all_trips() {
    let (database, trip) = seeded().await;
    let feed = TripFeed::start(database).await.unwrap();
    let trips = feed.current_trips();
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].id, trip.id);
    assert!(!feed.snapshot().has_error());
}

#[tokio::test]
async fn change_notifications_trigger_a_refetch() {
    let (database, _) = seeded().await;
    let feed = TripFeed::start(database.clone()).await.unwrap();
    let mut snapshots = feed.watch();

    database.insert_trip(trip("pending", &[])).await;
    wait_for(&mut snapshots, |snapshot| snapshot.trips.len() == 2).await;
}

#[tokio::test]
async fn upstream_status_changes_reach_the_feed() {
    let (database, trip) = seeded().await;
    let feed = TripFeed::start(database.clone()).await.unwrap();
    let mut snapshots = feed.watch();

    database.set_status(&trip.id, Stage::Handover.into()).await.unwrap();
    wait_for(&mut snapshots, |snapshot| {
        snapshot.trips[0].content.status.is(Stage::Handover)
    })
    .await;
}

#[tokio::test]
async fn bump_refreshes_without_notifications() {
    let (database, trip) = seeded().await;
    let feed = TripFeed::start(database.clone()).await.unwrap();
    database.set_notifications(false);

    database.record_unauthorized_stop(&trip.id).await.unwrap();
    assert_eq!(feed.current_trips()[0].content.unauthorized_stop_count, 0);

    let before = feed.refresh_token();
    let token = feed.bump_refresh().await.unwrap();
    assert!(token > before);
    assert_eq!(feed.snapshot().refresh_token, token);
    assert_eq!(feed.current_trips()[0].content.unauthorized_stop_count, 1);
}

#[tokio::test]
async fn failed_fetch_keeps_the_last_good_snapshot() {
    let (database, _) = seeded().await;
    let feed = TripFeed::start(database.clone()).await.unwrap();

    database.set_fail_reads(true);
    let result = feed.bump_refresh().await;
    assert!(matches!(result, Err(RequestError::Database(_))));
    let snapshot = feed.snapshot();
    assert!(snapshot.has_error());
    assert_eq!(snapshot.trips.len(), 1);

    database.set_fail_reads(false);
    let snapshot = feed.retry().await.unwrap();
    assert!(!snapshot.has_error());
    assert_eq!(snapshot.trips.len(), 1);
}

#[tokio::test]
async fn failed_initial_fetch_starts_in_error_state() {
    let (database, _) = seeded().await;
    database.set_fail_reads(true);
    let feed = TripFeed::start(database.clone()).await.unwrap();
    assert!(feed.snapshot().has_error());
    assert!(feed.current_trips().is_empty());
}

#[tokio::test]
async fn snapshots_are_replaced_not_mutated() {
    let (database, _) = seeded().await;
    let feed = TripFeed::start(database.clone()).await.unwrap();
    let held = feed.current_trips();

    database.set_notifications(false);
    database.insert_trip(trip("pending", &[])).await;
    feed.bump_refresh().await.unwrap();

    assert_eq!(held.len(), 1);
    assert_eq!(feed.current_trips().len(), 2);
    assert_eq!(database.list_trips().await.unwrap().len(), 2);
}

#[tokio::test]
async fn closing_tears_down_the_subscription() {
    let (database, _) = seeded().await;
    let feed = TripFeed::start(database.clone()).await.unwrap();
    assert!(feed.is_subscribed().await);

    feed.close().await;
    assert!(!feed.is_subscribed().await);
    assert!(matches!(
        feed.bump_refresh().await,
        Err(RequestError::SendError) | Err(RequestError::ResponseError(_))
    ));
    assert_eq!(feed.current_trips().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bumps_are_all_answered() {
    let (database, _) = seeded().await;
    let feed = TripFeed::start(database.clone()).await.unwrap();
    database.set_notifications(false);

    let handles = (0..8)
        .map(|_| {
            let feed = feed.clone();
            tokio::spawn(async move {
                let before = feed.refresh_token();
                let token = feed.bump_refresh().await.unwrap();
                (before, token)
            })
        })
        .collect::<Vec<_>>();

    let mut highest = 0;
    for handle in handles {
        let (before, token) = handle.await.unwrap();
        assert!(token > before, "token {token} not past {before}");
        highest = highest.max(token);
    }
    assert_eq!(highest, feed.refresh_token());
    assert_eq!(feed.snapshot().refresh_token, highest);
}
