use dispatch::database::DatabaseError;

pub mod directory;
pub mod listener;
pub mod trip;

pub(crate) fn convert_error(why: sqlx::Error) -> DatabaseError {
    match why {
        sqlx::Error::RowNotFound => DatabaseError::NotFound,
        sqlx::Error::ColumnDecode { index, source } => {
            DatabaseError::InvalidRecord(format!("column {}: {}", index, source))
        }
        _ => DatabaseError::Other(Box::new(why)),
    }
}
