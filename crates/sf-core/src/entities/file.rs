use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An uploaded document or photo attached to a study's `files` list.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: String,
    pub name: String,
    pub storage_path: String,
    pub download_url: String,
    pub size_bytes: u64,
    pub uploaded_at: DateTime<Utc>,
}
