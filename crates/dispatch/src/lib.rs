use chrono::{DateTime, Local};
use tokio::sync::oneshot;

pub mod assignment;
pub mod client;
pub mod database;
pub mod feed;
pub mod memory;
pub mod monitor;
pub mod status;
pub mod waypoints;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("the requested item does not exist")]
    NotFound,
    #[error("the driver change has not been confirmed")]
    Unconfirmed,
    #[error("the note is empty")]
    EmptyNote,
    #[error("dropoff {dropoff} is scheduled before pickup {pickup}")]
    InvalidSchedule {
        pickup: DateTime<Local>,
        dropoff: DateTime<Local>,
    },
    #[error("storage request failed: {0}")]
    Database(database::DatabaseError),
    #[error("the trip feed is no longer running")]
    SendError,
    #[error("the trip feed dropped the request")]
    ResponseError(#[from] oneshot::error::RecvError),
}

impl From<database::DatabaseError> for RequestError {
    fn from(value: database::DatabaseError) -> Self {
        match value {
            database::DatabaseError::NotFound => Self::NotFound,
            other => Self::Database(other),
        }
    }
}

pub type RequestResult<O> = Result<O, RequestError>;
