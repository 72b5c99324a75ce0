use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::content::ContentUnit;

/// Embedding output paired back with the identity of its source unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub document_id: String,
    pub owner_id: String,
    pub collection_ids: Vec<String>,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl VectorRecord {
    /// Builds a record from a unit and the vector computed for `text`.
    pub fn from_unit(unit: ContentUnit, text: String, vector: Vec<f32>) -> Self {
        Self {
            id: unit.id,
            document_id: unit.document_id,
            owner_id: unit.owner_id,
            collection_ids: unit.collection_ids,
            vector,
            text,
            metadata: unit.metadata,
        }
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

/// Failure of a single unit in per-item mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("failed to vectorize unit {unit_id} of document {document_id}: {message}")]
pub struct ProcessingError {
    pub unit_id: String,
    pub document_id: String,
    pub message: String,
}

impl ProcessingError {
    pub fn for_unit(unit: &ContentUnit, message: impl Into<String>) -> Self {
        Self {
            unit_id: unit.id.clone(),
            document_id: unit.document_id.clone(),
            message: message.into(),
        }
    }
}

/// Result of vectorizing one unit in per-item mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EmbedOutcome {
    Record(VectorRecord),
    Failed(ProcessingError),
}

impl EmbedOutcome {
    pub fn unit_id(&self) -> &str {
        match self {
            EmbedOutcome::Record(record) => &record.id,
            EmbedOutcome::Failed(err) => &err.unit_id,
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self, EmbedOutcome::Record(_))
    }
}
