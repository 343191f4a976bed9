use mongodb::bson;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Mongo error: {0}")]
    MongoError(#[from] mongodb::error::Error),

    #[error("Failed to access document value: {0}")]
    ValueAccessError(#[from] bson::document::ValueAccessError),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Data source unavailable: {0}")]
    Unavailable(String),
}
