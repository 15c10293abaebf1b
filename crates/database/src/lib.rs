use std::{env, error::Error};

use async_trait::async_trait;
use dispatch::database::{
    ChangeFeed, DirectoryRepo, OnChange, Result, Subscription, TripPatch, TripRepo,
};
use model::{
    driver::Driver,
    stop_point::{HighRiskZone, StopPoint},
    trip::Trip,
    vehicle::Vehicle,
    WithId,
};
use utility::id::Id;

pub mod data_model;
pub mod queries;

pub struct DatabaseConnectionInfo {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConnectionInfo {
    pub fn from_env() -> Option<Self> {
        let username = env::var("DATABASE_USER").ok()?;
        let password = env::var("DATABASE_PASSWORD").ok()?;
        let hostname = env::var("DATABASE_HOST").ok()?;
        let port: u16 = env::var("DATABASE_PORT").ok()?.parse().ok()?;
        let database = env::var("DATABASE_NAME").ok()?;
        Some(Self {
            username,
            password,
            hostname,
            port,
            database,
        })
    }

    pub(self) fn postgres_url(self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.hostname, self.port, self.database
        )
    }
}

/// The Postgres store. Trip changes are pushed through `LISTEN/NOTIFY`.
#[derive(Debug, Clone)]
pub struct PgDatabase {
    connection: sqlx::PgPool,
}

impl PgDatabase {
    pub async fn connect(
        database_connection_info: DatabaseConnectionInfo,
    ) -> core::result::Result<Self, Box<dyn Error>> {
        let url = database_connection_info.postgres_url();
        let pool = sqlx::postgres::PgPool::connect(&url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        log::info!("Connected to the trip store and applied migrations");

        Ok(Self { connection: pool })
    }
}

#[async_trait]
impl TripRepo for PgDatabase {
    async fn list_trips(&self) -> Result<Vec<WithId<Trip>>> {
        queries::trip::get_all(&self.connection).await
    }

    async fn get_trip(&self, id: &Id<Trip>) -> Result<WithId<Trip>> {
        queries::trip::get(&self.connection, id).await
    }

    async fn update_trip(&self, id: &Id<Trip>, patch: TripPatch) -> Result<WithId<Trip>> {
        queries::trip::update(&self.connection, id, patch).await
    }
}

#[async_trait]
impl DirectoryRepo for PgDatabase {
    async fn list_drivers(&self) -> Result<Vec<WithId<Driver>>> {
        queries::directory::drivers(&self.connection).await
    }

    async fn list_vehicles(&self) -> Result<Vec<WithId<Vehicle>>> {
        queries::directory::vehicles(&self.connection).await
    }

    async fn list_stop_points(&self) -> Result<Vec<WithId<StopPoint>>> {
        queries::directory::stop_points(&self.connection).await
    }

    async fn list_high_risk_zones(&self) -> Result<Vec<WithId<HighRiskZone>>> {
        queries::directory::high_risk_zones(&self.connection).await
    }
}

#[async_trait]
impl ChangeFeed for PgDatabase {
    async fn subscribe_trip_changes(&self, on_change: OnChange) -> Result<Subscription> {
        queries::listener::subscribe(&self.connection, on_change).await
    }
}
