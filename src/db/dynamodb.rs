use std::collections::HashMap;

use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use uuid::Uuid;

use super::{MetadataStore, ModelMetadata, ScratchRecord, StoreError};

const KIND_METADATA: &str = "model_metadata";
const KIND_SCRATCH: &str = "scratch";

/// DynamoDB-backed document store. One table holds both record kinds,
/// separated by a `kind` attribute; `get_latest` scans and picks the newest
/// date client-side, matching the no-index posture of the data model.
#[derive(Clone)]
pub struct DynamoMetadataStore {
    client: Client,
    table_name: String,
}

impl DynamoMetadataStore {
    pub fn new(client: Client, table_name: String) -> Self {
        info!("Initializing DynamoDB metadata store with table: {}", table_name);
        Self { client, table_name }
    }

    async fn scan_kind(
        &self,
        kind: &str,
    ) -> Result<Vec<HashMap<String, AttributeValue>>, StoreError> {
        let response = self
            .client
            .scan()
            .table_name(&self.table_name)
            .filter_expression("kind = :kind")
            .expression_attribute_values(":kind", AttributeValue::S(kind.to_string()))
            .send()
            .await
            .map_err(|e| {
                error!("AWS SDK error during scan for kind {}: {:?}", kind, e);
                StoreError::Backend(e.to_string())
            })?;
        Ok(response.items.unwrap_or_default())
    }

    async fn put_attributes(
        &self,
        attributes: HashMap<String, AttributeValue>,
    ) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(attributes))
            .send()
            .await
            .map_err(|e| {
                error!("AWS SDK error during put_item: {:?}", e);
                StoreError::Backend(e.to_string())
            })?;
        Ok(())
    }
}

impl MetadataStore for DynamoMetadataStore {
    async fn get_latest(&self) -> Result<Option<ModelMetadata>, StoreError> {
        debug!("Fetching latest model metadata from {}", self.table_name);
        let items = self.scan_kind(KIND_METADATA).await?;
        let mut records = items
            .iter()
            .map(attributes_to_metadata)
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by_key(|record| record.date);
        if records.is_empty() {
            warn!("No model metadata records in {}", self.table_name);
        }
        Ok(records.pop())
    }

    async fn insert_metadata(&self, record: &ModelMetadata) -> Result<(), StoreError> {
        info!("Inserting metadata record for model: {}", record.model_name);
        self.put_attributes(metadata_to_attributes(record)).await
    }

    async fn insert_one(&self, record: &ScratchRecord) -> Result<(), StoreError> {
        debug!("Inserting scratch record {}", record.id);
        self.put_attributes(scratch_to_attributes(record)).await
    }

    async fn find_one(&self) -> Result<Option<ScratchRecord>, StoreError> {
        let items = self.scan_kind(KIND_SCRATCH).await?;
        items.first().map(attributes_to_scratch).transpose()
    }

    async fn update_one(&self, id: &str, value: f64) -> Result<(), StoreError> {
        info!("Updating scratch record {}", id);
        // `value` is a DynamoDB reserved word, hence the name placeholder.
        self.client
            .update_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(id.to_string()))
            .update_expression("SET #value = :value")
            .expression_attribute_names("#value", "value")
            .expression_attribute_values(":value", AttributeValue::N(value.to_string()))
            .send()
            .await
            .map_err(|e| {
                error!("AWS SDK error during update_item for {}: {:?}", id, e);
                StoreError::Backend(e.to_string())
            })?;
        Ok(())
    }

    async fn delete_one(&self, id: &str) -> Result<(), StoreError> {
        info!("Deleting scratch record {}", id);
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("id", AttributeValue::S(id.to_string()))
            .send()
            .await
            .map_err(|e| {
                error!("AWS SDK error during delete_item for {}: {:?}", id, e);
                StoreError::Backend(e.to_string())
            })?;
        Ok(())
    }
}

fn metadata_to_attributes(record: &ModelMetadata) -> HashMap<String, AttributeValue> {
    let mut attributes = HashMap::new();
    attributes.insert(
        "id".to_string(),
        AttributeValue::S(Uuid::new_v4().to_string()),
    );
    attributes.insert(
        "kind".to_string(),
        AttributeValue::S(KIND_METADATA.to_string()),
    );
    attributes.insert(
        "model_name".to_string(),
        AttributeValue::S(record.model_name.clone()),
    );
    attributes.insert(
        "accuracy".to_string(),
        AttributeValue::N(record.accuracy.to_string()),
    );
    attributes.insert(
        "epochs".to_string(),
        AttributeValue::N(record.epochs.to_string()),
    );
    attributes.insert(
        "date".to_string(),
        AttributeValue::S(record.date.to_rfc3339()),
    );
    attributes.insert(
        "model_file".to_string(),
        AttributeValue::S(record.model_file.clone()),
    );
    attributes
}

fn attributes_to_metadata(
    attributes: &HashMap<String, AttributeValue>,
) -> Result<ModelMetadata, StoreError> {
    let date_raw = string_attr(attributes, "date")?;
    let date = DateTime::parse_from_rfc3339(&date_raw)
        .map_err(|e| StoreError::MalformedRecord(format!("bad date attribute: {}", e)))?
        .with_timezone(&Utc);
    Ok(ModelMetadata {
        model_name: string_attr(attributes, "model_name")?,
        accuracy: number_attr(attributes, "accuracy")?,
        epochs: number_attr(attributes, "epochs")? as u32,
        date,
        model_file: string_attr(attributes, "model_file")?,
    })
}

fn scratch_to_attributes(record: &ScratchRecord) -> HashMap<String, AttributeValue> {
    let mut attributes = HashMap::new();
    attributes.insert("id".to_string(), AttributeValue::S(record.id.clone()));
    attributes.insert(
        "kind".to_string(),
        AttributeValue::S(KIND_SCRATCH.to_string()),
    );
    attributes.insert("name".to_string(), AttributeValue::S(record.name.clone()));
    attributes.insert(
        "value".to_string(),
        AttributeValue::N(record.value.to_string()),
    );
    attributes.insert(
        "timestamp".to_string(),
        AttributeValue::N(record.timestamp.to_string()),
    );
    attributes
}

fn attributes_to_scratch(
    attributes: &HashMap<String, AttributeValue>,
) -> Result<ScratchRecord, StoreError> {
    Ok(ScratchRecord {
        id: string_attr(attributes, "id")?,
        name: string_attr(attributes, "name")?,
        value: number_attr(attributes, "value")?,
        timestamp: number_attr(attributes, "timestamp")? as i64,
    })
}

fn string_attr(
    attributes: &HashMap<String, AttributeValue>,
    key: &str,
) -> Result<String, StoreError> {
    attributes
        .get(key)
        .and_then(|av| av.as_s().ok())
        .map(|s| s.to_string())
        .ok_or_else(|| StoreError::MalformedRecord(format!("missing attribute: {}", key)))
}

fn number_attr(attributes: &HashMap<String, AttributeValue>, key: &str) -> Result<f64, StoreError> {
    attributes
        .get(key)
        .and_then(|av| av.as_n().ok())
        .ok_or_else(|| StoreError::MalformedRecord(format!("missing attribute: {}", key)))?
        .parse::<f64>()
        .map_err(|e| StoreError::MalformedRecord(format!("bad number in {}: {}", key, e)))
}
