//! # Embedding Model Module
//!
//! Embedding model plumbing on top of `rig`.
//!
//! - `RateLimitedEmbeddingModel`: wraps any embedding model with a `governor`
//!   rate limiter so indexing large sites stays inside the provider's quota
//! - `HashingEmbeddingModel`: deterministic offline embedder
//! - `EmbeddingConversion`: conversion to the `F32_BLOB` layout of the vector
//!   store
//! - `gemini_embedding_model`: the Gemini `text-embedding-004` model, rate limited

use std::num::NonZeroU32;

use rig::providers::gemini;

use crate::error::{Error, Result};

pub mod embedding;
pub mod hashing_embedding;
pub mod ratelimited_embedding;

pub use embedding::EmbeddingConversion;
pub use hashing_embedding::HashingEmbeddingModel;
pub use ratelimited_embedding::RateLimitedEmbeddingModel;

/// Environment variable holding the Gemini API key
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Requests per minute allowed against the Gemini embedding endpoint
pub const GEMINI_EMBEDDING_REQUESTS_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(1000) {
    Some(limit) => limit,
    None => NonZeroU32::MIN,
};

pub type GeminiEmbeddingModel = RateLimitedEmbeddingModel<gemini::embedding::EmbeddingModel>;

/// The rate-limited Gemini embedding model for an API key
pub fn gemini_embedding_model(api_key: &str) -> GeminiEmbeddingModel {
    let client = gemini::Client::new(api_key);
    RateLimitedEmbeddingModel::per_minute(
        client.embedding_model(gemini::embedding::EMBEDDING_004),
        GEMINI_EMBEDDING_REQUESTS_PER_MINUTE,
    )
}

/// The rate-limited Gemini embedding model, keyed from `GEMINI_API_KEY`
pub fn gemini_embedding_from_env() -> Result<GeminiEmbeddingModel> {
    let api_key = std::env::var(GEMINI_API_KEY_ENV).map_err(|_| {
        Error::Config(format!("{} environment variable must be set", GEMINI_API_KEY_ENV))
    })?;
    Ok(gemini_embedding_model(&api_key))
}
