use dispatch::database::Result;
use model::{
    driver::Driver,
    stop_point::{HighRiskZone, StopPoint},
    vehicle::Vehicle,
    WithId,
};
use sqlx::{Executor, Postgres};
use utility::let_also::LetAlso;

use crate::data_model::{
    directory::{DriverRow, HighRiskZoneRow, StopPointRow, VehicleRow},
    with_ids,
};

use super::convert_error;

pub async fn drivers<'c, E>(executor: E) -> Result<Vec<WithId<Driver>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, name, phone, license_number
        FROM drivers
        ORDER BY name;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|drivers: Vec<DriverRow>| Ok(with_ids(drivers)))
}

pub async fn vehicles<'c, E>(executor: E) -> Result<Vec<WithId<Vehicle>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, plate_number, model, capacity_tonnes
        FROM vehicles
        ORDER BY plate_number;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|vehicles: Vec<VehicleRow>| Ok(with_ids(vehicles)))
}

pub async fn stop_points<'c, E>(executor: E) -> Result<Vec<WithId<StopPoint>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, name, latitude, longitude, polygon
        FROM stop_points
        ORDER BY name;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|stop_points: Vec<StopPointRow>| Ok(with_ids(stop_points)))
}

pub async fn high_risk_zones<'c, E>(executor: E) -> Result<Vec<WithId<HighRiskZone>>>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        SELECT id, name, polygon
        FROM high_risk_zones
        ORDER BY name;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?
    .let_owned(|zones: Vec<HighRiskZoneRow>| Ok(with_ids(zones)))
}
