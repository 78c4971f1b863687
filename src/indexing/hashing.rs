//! Content-addressable document identities.
//!
//! A document's `uid` is a UUIDv5 over the SHA-256 of its normalized content and
//! the SHA-256 of its canonical metadata. Volatile metadata (the fetch
//! timestamp) is left out, so re-crawling an unchanged page yields the same uid.

use crate::document::{Document, Metadata};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Namespace of every document uid
pub const UID_NAMESPACE: Uuid = Uuid::from_u128(0x10f9_0ea3_90a4_4962_bf75_83a0_f3c1_c62a);

/// Metadata keys that change on every crawl and never affect identity
pub const VOLATILE_METADATA_KEYS: [&str; 1] = ["fetched_at"];

/// A document with its content-addressable identity
#[derive(Debug, Clone, PartialEq)]
pub struct HashedDocument {
    /// Identity derived from content and metadata
    pub uid: String,
    /// Hex SHA-256 of the normalized content
    pub content_hash: String,
    /// Hex SHA-256 of the canonical, non-volatile metadata
    pub metadata_hash: String,
    /// The original document
    pub document: Document,
}

impl HashedDocument {
    /// Hash a document
    pub fn from_document(document: Document) -> Self {
        let content_hash = sha256_hex(normalize_content(&document.content).as_bytes());
        let metadata_hash = sha256_hex(canonical_metadata(&document.metadata).as_bytes());
        let uid = Uuid::new_v5(
            &UID_NAMESPACE,
            format!("{}{}", content_hash, metadata_hash).as_bytes(),
        )
        .to_string();

        Self {
            uid,
            content_hash,
            metadata_hash,
            document,
        }
    }

    /// The document content
    pub fn content(&self) -> &str {
        &self.document.content
    }

    /// The document metadata
    pub fn metadata(&self) -> &Metadata {
        &self.document.metadata
    }

    /// Give back the document
    pub fn into_document(self) -> Document {
        self.document
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn normalize_content(content: &str) -> String {
    content.replace("\r\n", "\n").trim().to_string()
}

fn canonical_metadata(metadata: &Metadata) -> String {
    let stable: BTreeMap<&String, Value> = metadata
        .iter()
        .filter(|(key, _)| !VOLATILE_METADATA_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key, sorted(value)))
        .collect();
    let object: Map<String, Value> = stable
        .into_iter()
        .map(|(key, value)| (key.clone(), value))
        .collect();
    Value::Object(object).to_string()
}

/// Rebuild `value` with object keys inserted in sorted order at every level.
/// Compact serialization then sorts keys whether or not `serde_json` keeps
/// insertion order.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let entries: BTreeMap<&String, Value> =
                map.iter().map(|(key, value)| (key, sorted(value))).collect();
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), value))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        scalar => scalar.clone(),
    }
}

/// Keep the first occurrence of every uid, preserving order
pub fn dedupe_in_order(documents: Vec<HashedDocument>) -> Vec<HashedDocument> {
    let mut seen = HashSet::new();
    documents
        .into_iter()
        .filter(|doc| seen.insert(doc.uid.clone()))
        .collect()
}

/// Strategy deciding which group (source) a document belongs to
#[derive(Clone, Default)]
pub enum SourceIdAssigner {
    /// No document has a source id
    #[default]
    None,
    /// Read the source id from a metadata field
    MetadataKey(String),
    /// Compute the source id with a function
    Custom(Arc<dyn Fn(&Document) -> Option<String> + Send + Sync>),
}

impl SourceIdAssigner {
    /// Build the assigner for an optional metadata key
    pub fn from_key(key: Option<&str>) -> Self {
        match key {
            Some(key) => Self::MetadataKey(key.to_string()),
            None => Self::None,
        }
    }

    /// Build an assigner from a function
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Document) -> Option<String> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// The source id of a document, if it has one
    pub fn assign(&self, document: &Document) -> Option<String> {
        match self {
            Self::None => None,
            Self::MetadataKey(key) => match document.metadata.get(key) {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
            },
            Self::Custom(f) => f(document),
        }
    }
}

impl fmt::Debug for SourceIdAssigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::MetadataKey(key) => f.debug_tuple("MetadataKey").field(key).finish(),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}
