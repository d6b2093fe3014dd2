use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(murmur_db::DbError),
}

impl From<murmur_db::DbError> for CoreError {
    fn from(e: murmur_db::DbError) -> Self {
        match e {
            murmur_db::DbError::NotFound => CoreError::NotFound,
            other => CoreError::Database(other),
        }
    }
}
