pub mod constant;
pub mod error;
pub mod mongodb;

use ::mongodb::bson::{Bson, Document};
use async_trait::async_trait;
use futures::stream::BoxStream;
pub use error::DatabaseError;

/// Documents streamed from a cursor. Dropping the stream releases the cursor.
pub type DocumentStream = BoxStream<'static, Result<Document, DatabaseError>>;

/// Read-only view of the annotation store.
///
/// One instance is owned by exactly one worker and never shared, so implementations
/// may hold a dedicated connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnnotationStore: Send + Sync {
    /// ping - Round-trip to the server, used to fail fast at startup
    async fn ping(&self) -> Result<(), DatabaseError>;

    /// stream_analyses - Stream the analysis catalog with the given projection
    async fn stream_analyses(&self, projection: Document) -> Result<DocumentStream, DatabaseError>;

    /// fetch_analyses - Full analysis documents for the given `_id`s
    async fn fetch_analyses(&self, ids: Vec<Bson>) -> Result<Vec<Document>, DatabaseError>;

    /// stream_marks - Stream every mark matching `filter`, in cursor order
    async fn stream_marks(&self, filter: Document) -> Result<DocumentStream, DatabaseError>;
}

/// Opens a fresh [`AnnotationStore`] per caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn AnnotationStore>, DatabaseError>;
}
