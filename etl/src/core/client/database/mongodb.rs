use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client, Collection, Database};
use tracing::{debug, trace};

use super::constant::APP_NAME;
use super::error::DatabaseError;
use super::{AnnotationStore, DocumentStream, StoreConnector};
use crate::config::DatabaseConfig;

/// MongoDB client implementation
pub struct MongoDbClient {
    database: Arc<Database>,
    analysis_collection: String,
    marks_collection: String,
    cursor_batch_size: u32,
}

impl MongoDbClient {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let mut options = ClientOptions::parse(&config.connection_url).await?;
        options.app_name = Some(APP_NAME.to_string());
        options.server_selection_timeout = Some(Duration::from_secs(config.server_selection_timeout_seconds));

        let client = Client::with_options(options)?;
        let database = Arc::new(client.database(&config.database_name));
        debug!(database = %config.database_name, "MongoDB client created");
        Ok(Self {
            database,
            analysis_collection: config.analysis_collection.clone(),
            marks_collection: config.marks_collection.clone(),
            cursor_batch_size: config.cursor_batch_size,
        })
    }

    fn get_collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }

    fn find_options(&self, projection: Option<Document>) -> FindOptions {
        FindOptions::builder().batch_size(self.cursor_batch_size).projection(projection).build()
    }

    async fn stream(
        &self,
        collection: &str,
        filter: Document,
        projection: Option<Document>,
    ) -> Result<DocumentStream, DatabaseError> {
        trace!(collection, filter = %filter, "Opening cursor");
        let cursor = self.get_collection(collection).find(filter, self.find_options(projection)).await?;
        Ok(cursor.map_err(DatabaseError::from).boxed())
    }
}

#[async_trait]
impl AnnotationStore for MongoDbClient {
    async fn ping(&self) -> Result<(), DatabaseError> {
        self.database.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    async fn stream_analyses(&self, projection: Document) -> Result<DocumentStream, DatabaseError> {
        self.stream(&self.analysis_collection, doc! {}, Some(projection)).await
    }

    async fn fetch_analyses(&self, ids: Vec<Bson>) -> Result<Vec<Document>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let filter = doc! { "_id": { "$in": ids } };
        let cursor = self.get_collection(&self.analysis_collection).find(filter, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn stream_marks(&self, filter: Document) -> Result<DocumentStream, DatabaseError> {
        self.stream(&self.marks_collection, filter, None).await
    }
}

/// Hands every worker its own [`MongoDbClient`].
pub struct MongoConnector {
    config: DatabaseConfig,
}

impl MongoConnector {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl StoreConnector for MongoConnector {
    async fn connect(&self) -> Result<Box<dyn AnnotationStore>, DatabaseError> {
        Ok(Box::new(MongoDbClient::new(&self.config).await?))
    }
}
