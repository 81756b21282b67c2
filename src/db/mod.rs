pub mod dynamodb;
pub mod memory;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("malformed record: {0}")]
    MalformedRecord(String),
}

/// Provenance record written once per training run, read back as
/// most-recent-by-date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_name: String,
    pub accuracy: f64,
    pub epochs: u32,
    pub date: DateTime<Utc>,
    pub model_file: String,
}

/// Meaningless test data sharing the metadata table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScratchRecord {
    pub id: String,
    pub name: String,
    pub value: f64,
    pub timestamp: i64,
}

impl ScratchRecord {
    pub fn random(rng: &mut impl Rng) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: format!("Item {}", rng.random_range(1..=1000)),
            value: rng.random_range(1.0..100.0),
            timestamp: Utc::now().timestamp(),
        }
    }
}

/// Capability interface over the document store so the CRUD collaborator can
/// be swapped or mocked without touching the inference pipeline. All
/// operations are single-document; there are no transactions and no schema
/// enforcement beyond the caller's discipline.
#[allow(async_fn_in_trait)]
pub trait MetadataStore: Clone + 'static {
    async fn get_latest(&self) -> Result<Option<ModelMetadata>, StoreError>;
    async fn insert_metadata(&self, record: &ModelMetadata) -> Result<(), StoreError>;
    async fn insert_one(&self, record: &ScratchRecord) -> Result<(), StoreError>;
    async fn find_one(&self) -> Result<Option<ScratchRecord>, StoreError>;
    async fn update_one(&self, id: &str, value: f64) -> Result<(), StoreError>;
    async fn delete_one(&self, id: &str) -> Result<(), StoreError>;
}
