//! # Indexing Configuration Module
//!
//! Options recognized by the indexing engine and their defaults:
//!
//! - `cleanup`: `incremental` (default), `full` or `none`
//! - `source_id_key`: metadata field used as the group key, required for
//!   incremental cleanup
//! - `batch_size`: documents per batch (default 100)
//! - `cleanup_batch_size`: page size of the full cleanup sweep (default 1000)
//! - `force_update`: re-embed documents that already exist (default false)

use crate::indexing::error::IndexError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How stale records are removed after indexing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CleanupMode {
    /// Per batch, delete stale records sharing a group with the batch
    #[default]
    Incremental,
    /// After all batches, delete every record not touched by this run
    Full,
    /// Never delete
    None,
}

impl FromStr for CleanupMode {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "incremental" => Ok(Self::Incremental),
            "full" => Ok(Self::Full),
            "none" => Ok(Self::None),
            other => Err(IndexError::InvalidConfig(format!(
                "Unknown cleanup mode '{}', expected incremental, full or none",
                other
            ))),
        }
    }
}

impl fmt::Display for CleanupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Incremental => "incremental",
            Self::Full => "full",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// Configuration for an indexing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingConfig {
    /// Cleanup policy
    pub cleanup: CleanupMode,

    /// Metadata key holding the source id
    pub source_id_key: Option<String>,

    /// Number of documents processed per batch
    pub batch_size: usize,

    /// Number of keys deleted per page during full cleanup
    pub cleanup_batch_size: usize,

    /// Re-index documents even when their uid is already recorded
    pub force_update: bool,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            cleanup: CleanupMode::default(),
            source_id_key: None,
            batch_size: 100,
            cleanup_batch_size: 1000,
            force_update: false,
        }
    }
}

impl IndexingConfig {
    /// Create a new builder
    pub fn builder() -> IndexingConfigBuilder {
        IndexingConfigBuilder::new()
    }

    /// Reject option combinations that can never run
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.cleanup == CleanupMode::Incremental && self.source_id_key.is_none() {
            return Err(IndexError::MissingSourceIdKey);
        }
        if self.batch_size == 0 {
            return Err(IndexError::InvalidConfig(
                "batch_size must be greater than zero".to_string(),
            ));
        }
        if self.cleanup_batch_size == 0 {
            return Err(IndexError::InvalidConfig(
                "cleanup_batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for IndexingConfig
#[derive(Debug, Default)]
pub struct IndexingConfigBuilder {
    config: IndexingConfig,
}

impl IndexingConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cleanup mode
    pub fn cleanup(mut self, cleanup: CleanupMode) -> Self {
        self.config.cleanup = cleanup;
        self
    }

    /// Set the metadata key holding the source id
    pub fn source_id_key(mut self, key: impl Into<String>) -> Self {
        self.config.source_id_key = Some(key.into());
        self
    }

    /// Set the batch size
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    /// Set the full cleanup page size
    pub fn cleanup_batch_size(mut self, cleanup_batch_size: usize) -> Self {
        self.config.cleanup_batch_size = cleanup_batch_size;
        self
    }

    /// Set whether existing documents are re-indexed
    pub fn force_update(mut self, force_update: bool) -> Self {
        self.config.force_update = force_update;
        self
    }

    /// Build the configuration
    pub fn build(self) -> IndexingConfig {
        self.config
    }
}
