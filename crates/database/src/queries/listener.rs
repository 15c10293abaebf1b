use std::time::Duration;

use dispatch::database::{ChangeKind, OnChange, Result, Subscription, TripChange};
use serde::Deserialize;
use sqlx::{postgres::PgListener, PgPool};
use utility::id::Id;

use super::convert_error;

/// Channel the `trips_notify_change` trigger publishes on.
pub const TRIP_CHANGES_CHANNEL: &str = "trip_changes";

const RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct Payload {
    operation: String,
    id: Option<String>,
}

pub(crate) fn parse_payload(payload: &str) -> TripChange {
    match serde_json::from_str::<Payload>(payload) {
        Ok(payload) => TripChange::new(
            ChangeKind::parse(&payload.operation),
            payload.id.map(Id::new),
        ),
        Err(why) => {
            log::debug!("Unreadable trip change payload {:?}: {}", payload, why);
            TripChange::new(ChangeKind::Unknown, None)
        }
    }
}

pub async fn subscribe(pool: &PgPool, on_change: OnChange) -> Result<Subscription> {
    let mut listener = PgListener::connect_with(pool)
        .await
        .map_err(convert_error)?;
    listener
        .listen(TRIP_CHANGES_CHANNEL)
        .await
        .map_err(convert_error)?;

    let task = tokio::spawn(async move {
        loop {
            match listener.recv().await {
                Ok(notification) => on_change(parse_payload(notification.payload())),
                Err(why) => {
                    log::warn!("Trip change listener failed: {}", why);
                    // Notifications may have been lost; have consumers refetch.
                    on_change(TripChange::new(ChangeKind::Unknown, None));
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    });
    Ok(Subscription::new(task))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"operation":"INSERT","id":"t1"}"#, ChangeKind::Insert, Some("t1"))]
    #[case(r#"{"operation":"UPDATE","id":"t2"}"#, ChangeKind::Update, Some("t2"))]
    #[case(r#"{"operation":"DELETE","id":"t3"}"#, ChangeKind::Delete, Some("t3"))]
    #[case(r#"{"operation":"TRUNCATE","id":null}"#, ChangeKind::Unknown, None)]
    #[case("not json", ChangeKind::Unknown, None)]
    fn payloads(
        #[case] payload: &str,
        #[case] kind: ChangeKind,
        #[case] id: Option<&str>,
    ) {
        let change = parse_payload(payload);
        assert_eq!(change.kind, kind);
        assert_eq!(change.trip_id.as_ref().map(|id| id.as_str()), id);
    }
}
