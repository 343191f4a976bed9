pub mod database;

pub use database::{AnnotationStore, DatabaseError, StoreConnector};
