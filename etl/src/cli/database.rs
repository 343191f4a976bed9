use clap::Args;

/// MongoDB connection settings.
#[derive(Debug, Clone, Args)]
pub struct DatabaseCliArgs {
    /// The connection string to the MongoDB server.
    #[arg(env = "GEOSPARQL_ETL_MONGODB_CONNECTION_URL", long)]
    pub connection_url: Option<String>,

    /// The name of the database holding the analysis and mark collections.
    #[arg(env = "GEOSPARQL_ETL_MONGODB_DATABASE_NAME", long)]
    pub database_name: Option<String>,

    /// The collection holding analysis documents.
    #[arg(env = "GEOSPARQL_ETL_ANALYSIS_COLLECTION", long)]
    pub analysis_collection: Option<String>,

    /// The collection holding marks.
    #[arg(env = "GEOSPARQL_ETL_MARKS_COLLECTION", long)]
    pub marks_collection: Option<String>,

    /// Documents fetched per cursor round trip.
    #[arg(env = "GEOSPARQL_ETL_CURSOR_BATCH_SIZE", long)]
    pub cursor_batch_size: Option<u32>,
}
