use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Raw payload of a content unit.
///
/// JSON strings deserialize to [`Payload::Text`], JSON byte arrays to [`Payload::Binary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Binary(Vec<u8>),
}

impl Payload {
    /// Returns the text if this payload can be sent to the provider.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Binary(_) => None,
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

/// One chunk of a source document, produced upstream and never mutated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentUnit {
    pub id: String,
    pub document_id: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub collection_ids: Vec<String>,
    pub payload: Payload,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ContentUnit {
    pub fn new(
        id: impl Into<String>,
        document_id: impl Into<String>,
        payload: impl Into<Payload>,
    ) -> Self {
        Self {
            id: id.into(),
            document_id: document_id.into(),
            owner_id: String::new(),
            collection_ids: Vec::new(),
            payload: payload.into(),
            metadata: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = owner_id.into();
        self
    }

    #[must_use]
    pub fn with_collections(mut self, collection_ids: Vec<String>) -> Self {
        self.collection_ids = collection_ids;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// A group of content units submitted to the provider in one call.
#[derive(Debug, Clone)]
pub struct Batch {
    seq: u64,
    units: Vec<ContentUnit>,
}

impl Batch {
    pub fn new(seq: u64, units: Vec<ContentUnit>) -> Self {
        Self { seq, units }
    }

    /// Position of this batch in the order it was formed, starting at 0.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[ContentUnit] {
        &self.units
    }

    pub fn into_units(self) -> Vec<ContentUnit> {
        self.units
    }
}
