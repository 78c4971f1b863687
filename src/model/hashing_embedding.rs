//! Deterministic, offline embedding model.
//!
//! Each lowercase alphanumeric token is hashed with SHA-256 into a signed
//! bucket; the bucket counts are L2-normalized. Texts sharing words end up
//! close in cosine distance, which is enough for tests and for indexing
//! without network access.

use rig::embeddings::{Embedding, EmbeddingError, EmbeddingModel};
use sha2::{Digest, Sha256};

/// Embedding model that hashes tokens into a fixed number of buckets.
///
/// Needs no API key and gives the same vector for the same text on every
/// run, so an index built with it must also be searched with it.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingModel {
    ndims: usize,
}

impl Default for HashingEmbeddingModel {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DIMENSIONS)
    }
}

impl HashingEmbeddingModel {
    /// Vector size used by [`Default`] and by the CLI's `--embedder hashing`
    pub const DEFAULT_DIMENSIONS: usize = 256;

    /// Create a model producing vectors of `ndims` dimensions (at least one)
    pub fn new(ndims: usize) -> Self {
        Self {
            ndims: ndims.max(1),
        }
    }

    /// Embed a single text
    pub fn embed(&self, text: &str) -> Vec<f64> {
        let mut vec = vec![0.0; self.ndims];
        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase);

        for token in tokens {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.ndims as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vec[bucket] += sign;
        }

        let norm = vec.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm == 0.0 {
            // texts without tokens still need a valid direction for cosine distance
            vec[0] = 1.0;
        } else {
            vec.iter_mut().for_each(|v| *v /= norm);
        }
        vec
    }
}

impl EmbeddingModel for HashingEmbeddingModel {
    const MAX_DOCUMENTS: usize = 1024;

    fn ndims(&self) -> usize {
        self.ndims
    }

    async fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> Result<Vec<Embedding>, EmbeddingError> {
        Ok(texts
            .into_iter()
            .map(|text| Embedding {
                vec: self.embed(&text),
                document: text,
            })
            .collect())
    }
}
