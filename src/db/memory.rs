use std::sync::{Arc, Mutex};

use super::{MetadataStore, ModelMetadata, ScratchRecord, StoreError};

/// In-memory store, used by the endpoint tests and for local runs without a
/// DynamoDB table.
#[derive(Clone, Default)]
pub struct MemoryMetadataStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    metadata: Vec<ModelMetadata>,
    scratch: Vec<ScratchRecord>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scratch_len(&self) -> usize {
        self.inner.lock().unwrap().scratch.len()
    }
}

impl MetadataStore for MemoryMetadataStore {
    async fn get_latest(&self) -> Result<Option<ModelMetadata>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .metadata
            .iter()
            .max_by_key(|record| record.date)
            .cloned())
    }

    async fn insert_metadata(&self, record: &ModelMetadata) -> Result<(), StoreError> {
        self.inner.lock().unwrap().metadata.push(record.clone());
        Ok(())
    }

    async fn insert_one(&self, record: &ScratchRecord) -> Result<(), StoreError> {
        self.inner.lock().unwrap().scratch.push(record.clone());
        Ok(())
    }

    async fn find_one(&self) -> Result<Option<ScratchRecord>, StoreError> {
        Ok(self.inner.lock().unwrap().scratch.first().cloned())
    }

    async fn update_one(&self, id: &str, value: f64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(record) = inner.scratch.iter_mut().find(|record| record.id == id) {
            record.value = value;
        }
        Ok(())
    }

    async fn delete_one(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.scratch.retain(|record| record.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn metadata(name: &str, age: Duration) -> ModelMetadata {
        ModelMetadata {
            model_name: name.to_string(),
            accuracy: 0.5,
            epochs: 5,
            date: Utc::now() - age,
            model_file: "mnist_model.json".to_string(),
        }
    }

    #[actix_web::test]
    async fn get_latest_returns_none_on_an_empty_store() {
        let store = MemoryMetadataStore::new();
        assert!(store.get_latest().await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn get_latest_prefers_the_newest_date() {
        let store = MemoryMetadataStore::new();
        store
            .insert_metadata(&metadata("older", Duration::hours(2)))
            .await
            .unwrap();
        store
            .insert_metadata(&metadata("newer", Duration::minutes(1)))
            .await
            .unwrap();

        let latest = store.get_latest().await.unwrap().unwrap();
        assert_eq!(latest.model_name, "newer");
    }

    #[actix_web::test]
    async fn scratch_records_can_be_updated_and_deleted() {
        let store = MemoryMetadataStore::new();
        let record = ScratchRecord {
            id: "one".to_string(),
            name: "Item 1".to_string(),
            value: 10.0,
            timestamp: 0,
        };
        store.insert_one(&record).await.unwrap();

        store.update_one("one", 99.0).await.unwrap();
        let found = store.find_one().await.unwrap().unwrap();
        assert_eq!(found.value, 99.0);

        store.delete_one("one").await.unwrap();
        assert!(store.find_one().await.unwrap().is_none());
    }
}
