pub const ANALYSIS_COLLECTION: &str = "analysis";
pub const MARKS_COLLECTION: &str = "mark";
pub const APP_NAME: &str = "geosparql-etl";
