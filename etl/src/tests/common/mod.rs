use std::cmp::Ordering;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use futures::stream::{self, StreamExt};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, Bson, Document};
use rstest::fixture;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use crate::checkpoint::CheckpointStore;
use crate::config::EtlConfig;
use crate::core::client::database::{AnnotationStore, DatabaseError, DocumentStream, StoreConnector};
use crate::types::document::lookup;
use crate::types::MarkLink;
use crate::worker::{Orchestrator, RunSummary};
use crate::writer::turtle::parse;
use crate::writer::vocab::geo;

/// Annotation store backed by two in-memory collections.
///
/// Filters support what the pipeline sends: equality on dotted paths (`null` also
/// matching a missing field), `$in`, `$exists`, and `$gte` / `$lt` on ObjectIds.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    analyses: Arc<Vec<Document>>,
    marks: Arc<Vec<Document>>,
}

impl InMemoryStore {
    pub fn new(analyses: Vec<Document>, marks: Vec<Document>) -> Self {
        Self { analyses: Arc::new(analyses), marks: Arc::new(marks) }
    }
}

fn documents(docs: Vec<Document>) -> DocumentStream {
    stream::iter(docs.into_iter().map(Ok)).boxed()
}

#[async_trait]
impl AnnotationStore for InMemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn stream_analyses(&self, _projection: Document) -> Result<DocumentStream, DatabaseError> {
        Ok(documents(self.analyses.as_ref().clone()))
    }

    async fn fetch_analyses(&self, ids: Vec<Bson>) -> Result<Vec<Document>, DatabaseError> {
        Ok(self.analyses.iter().filter(|doc| doc.get("_id").is_some_and(|id| ids.contains(id))).cloned().collect())
    }

    async fn stream_marks(&self, filter: Document) -> Result<DocumentStream, DatabaseError> {
        Ok(documents(self.marks.iter().filter(|mark| matches(mark, &filter)).cloned().collect()))
    }
}

#[async_trait]
impl StoreConnector for InMemoryStore {
    async fn connect(&self) -> Result<Box<dyn AnnotationStore>, DatabaseError> {
        Ok(Box::new(self.clone()))
    }
}

fn matches(doc: &Document, filter: &Document) -> bool {
    filter.iter().all(|(path, condition)| {
        let value = lookup(doc, path);
        match condition {
            Bson::Document(ops) if ops.keys().all(|op| op.starts_with('$')) => {
                ops.iter().all(|(op, argument)| match op.as_str() {
                    "$in" => argument.as_array().is_some_and(|options| value.is_some_and(|v| options.contains(v))),
                    "$exists" => value.is_some() == argument.as_bool().unwrap_or(true),
                    "$gte" => compare(value, argument).is_some_and(Ordering::is_ge),
                    "$lt" => compare(value, argument).is_some_and(Ordering::is_lt),
                    _ => false,
                })
            }
            Bson::Null => value.map_or(true, |v| *v == Bson::Null),
            expected => value == Some(expected),
        }
    })
}

fn compare(value: Option<&Bson>, bound: &Bson) -> Option<Ordering> {
    match (value?, bound) {
        (Bson::ObjectId(a), Bson::ObjectId(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Cancels `token` while opening the `after`-th connection.
pub struct CancelOnConnect {
    pub inner: InMemoryStore,
    pub token: CancellationToken,
    pub after: usize,
    pub connects: AtomicUsize,
}

#[async_trait]
impl StoreConnector for CancelOnConnect {
    async fn connect(&self) -> Result<Box<dyn AnnotationStore>, DatabaseError> {
        if self.connects.fetch_add(1, AtomicOrdering::SeqCst) + 1 == self.after {
            self.token.cancel();
        }
        self.inner.connect().await
    }
}

/// Cancels `token` whenever analyses are fetched by id.
#[derive(Debug, Clone)]
pub struct CancelOnFetch {
    pub inner: InMemoryStore,
    pub token: CancellationToken,
}

#[async_trait]
impl AnnotationStore for CancelOnFetch {
    async fn ping(&self) -> Result<(), DatabaseError> {
        self.inner.ping().await
    }

    async fn stream_analyses(&self, projection: Document) -> Result<DocumentStream, DatabaseError> {
        self.inner.stream_analyses(projection).await
    }

    async fn fetch_analyses(&self, ids: Vec<Bson>) -> Result<Vec<Document>, DatabaseError> {
        self.token.cancel();
        self.inner.fetch_analyses(ids).await
    }

    async fn stream_marks(&self, filter: Document) -> Result<DocumentStream, DatabaseError> {
        self.inner.stream_marks(filter).await
    }
}

#[async_trait]
impl StoreConnector for CancelOnFetch {
    async fn connect(&self) -> Result<Box<dyn AnnotationStore>, DatabaseError> {
        Ok(Box::new(self.clone()))
    }
}

/// Panics on every connection after the first `healthy` ones.
pub struct PanicOnConnect {
    pub inner: InMemoryStore,
    pub healthy: usize,
    pub connects: AtomicUsize,
}

#[async_trait]
impl StoreConnector for PanicOnConnect {
    async fn connect(&self) -> Result<Box<dyn AnnotationStore>, DatabaseError> {
        if self.connects.fetch_add(1, AtomicOrdering::SeqCst) >= self.healthy {
            panic!("mark cursor exploded");
        }
        self.inner.connect().await
    }
}

#[fixture]
pub fn workspace() -> TempDir {
    TempDir::new().expect("temp dir")
}

/// Provenance-linked grouping run rooted at `root`.
pub fn test_config(root: &Path) -> EtlConfig {
    let mut config = EtlConfig::default();
    config.service.worker_count = 2;
    config.service.progress_interval = 1;
    config.service.shutdown_timeout_seconds = 5;
    config.storage.output_dir = root.join("out");
    config.storage.batch_size = 10;
    config.checkpoint.dir = root.join("checkpoints");
    config.source.mark_link = Some(MarkLink::Provenance);
    config
}

pub async fn run_pipeline(
    config: &EtlConfig,
    connector: Arc<dyn StoreConnector>,
    token: CancellationToken,
) -> RunSummary {
    let checkpoint = Arc::new(
        CheckpointStore::open(config.checkpoint.dir.clone(), config.checkpoint.rotation_policy()).expect("checkpoint"),
    );
    Orchestrator::new(config.clone(), connector, checkpoint, token).run().await.expect("run")
}

pub fn analysis(id: &str, execution_id: &str, image_id: &str) -> Document {
    doc! {
        "_id": id,
        "analysis": {
            "execution_id": execution_id,
            "algorithm_params": { "image_width": 100, "image_height": 100 },
        },
        "image": { "imageid": image_id },
    }
}

pub fn mark(execution_id: &str, image_id: &str, geometry: Document) -> Document {
    doc! {
        "_id": ObjectId::new(),
        "provenance": { "analysis": { "execution_id": execution_id }, "image": { "imageid": image_id } },
        "geometry": geometry,
    }
}

pub fn polygon(points: &[(f64, f64)]) -> Document {
    let ring: Vec<Bson> = points.iter().map(|(x, y)| Bson::Array(vec![Bson::Double(*x), Bson::Double(*y)])).collect();
    doc! { "type": "Polygon", "coordinates": [Bson::Array(ring)] }
}

pub fn square() -> Document {
    polygon(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)])
}

pub fn closed_triangle() -> Document {
    polygon(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)])
}

pub fn point() -> Document {
    doc! { "type": "Point", "coordinates": [0.5, 0.5] }
}

pub fn read_batch(path: &Path) -> String {
    let mut text = String::new();
    GzDecoder::new(File::open(path).expect("batch file")).read_to_string(&mut text).expect("gzip");
    text
}

/// Member WKT literals of a Turtle document, in document order.
pub fn wkt_literals(document: &str) -> Vec<String> {
    parse::values(&parse::triples(document.as_bytes()), geo::AS_WKT)
}

/// Batch files of one output directory, in batch order.
pub fn batch_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else { return Vec::new() };
    let mut files: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.to_string_lossy().ends_with(".ttl.gz"))
        .collect();
    files.sort();
    files
}

pub fn completed_keys(checkpoint_dir: &Path) -> Vec<String> {
    let text = std::fs::read_to_string(checkpoint_dir.join("completed_analyses.txt")).unwrap_or_default();
    let mut keys: Vec<String> = text.lines().map(str::to_string).collect();
    keys.sort();
    keys
}
