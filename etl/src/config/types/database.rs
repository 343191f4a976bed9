use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_connection_url")]
    pub connection_url: String,

    #[serde(default = "default_db_name")]
    pub database_name: String,

    #[serde(default = "default_analysis_collection")]
    pub analysis_collection: String,

    #[serde(default = "default_marks_collection")]
    pub marks_collection: String,

    /// Documents requested per cursor round trip
    #[serde(default = "default_cursor_batch_size")]
    pub cursor_batch_size: u32,

    #[serde(default = "default_server_selection_timeout")]
    pub server_selection_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_url: default_connection_url(),
            database_name: default_db_name(),
            analysis_collection: default_analysis_collection(),
            marks_collection: default_marks_collection(),
            cursor_batch_size: default_cursor_batch_size(),
            server_selection_timeout_seconds: default_server_selection_timeout(),
        }
    }
}

fn default_connection_url() -> String {
    "mongodb://localhost:27017".to_string()
}
fn default_db_name() -> String {
    "camic".to_string()
}
fn default_analysis_collection() -> String {
    "analysis".to_string()
}
fn default_marks_collection() -> String {
    "mark".to_string()
}
fn default_cursor_batch_size() -> u32 {
    5000
}
fn default_server_selection_timeout() -> u64 {
    30
}
