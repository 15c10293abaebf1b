use dispatch::database::{Result, TripPatch};
use model::{trip::Trip, WithId};
use sqlx::{types::Json, Executor, Postgres};
use utility::{id::Id, let_also::LetAlso};

use crate::data_model::{trip::TripRow, with_id, with_ids};

use super::convert_error;

pub async fn get_all<'c, E>(executor: E) -> Result<Vec<WithId<Trip>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            id, status, origin, destination, assignments, selected_stop_points,
            pickup_schedule, dropoff_schedule, unauthorized_stop_count,
            route_points, status_notes, created_at, updated_at
        FROM trips
        ORDER BY created_at DESC;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|trips: Vec<TripRow>| Ok(with_ids(trips)))
}

pub async fn get<'c, E>(executor: E, id: &Id<Trip>) -> Result<WithId<Trip>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT
            id, status, origin, destination, assignments, selected_stop_points,
            pickup_schedule, dropoff_schedule, unauthorized_stop_count,
            route_points, status_notes, created_at, updated_at
        FROM trips
        WHERE id = $1;
        ",
    )
    .bind(id.as_str())
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: TripRow| with_id(row))
}

/// Unset fields are bound as `NULL` and keep their stored value.
pub async fn update<'c, E>(executor: E, id: &Id<Trip>, patch: TripPatch) -> Result<WithId<Trip>>
where
    E: Executor<'c, Database = Postgres>,
{
    let count = patch
        .unauthorized_stop_count
        .map(|count| i32::try_from(count).unwrap_or(i32::MAX));
    sqlx::query_as(
        "
        UPDATE trips
        SET unauthorized_stop_count = COALESCE($2, unauthorized_stop_count),
            status_notes = COALESCE($3, status_notes),
            assignments = COALESCE($4, assignments),
            pickup_schedule = COALESCE($5, pickup_schedule),
            dropoff_schedule = COALESCE($6, dropoff_schedule),
            updated_at = now()
        WHERE id = $1
        RETURNING
            id, status, origin, destination, assignments, selected_stop_points,
            pickup_schedule, dropoff_schedule, unauthorized_stop_count,
            route_points, status_notes, created_at, updated_at;
        ",
    )
    .bind(id.as_str())
    .bind(count)
    .bind(patch.status_notes)
    .bind(patch.assignments.map(Json))
    .bind(patch.pickup_schedule.map(Json))
    .bind(patch.dropoff_schedule.map(Json))
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(|row: TripRow| with_id(row))
}
