use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use rig::embeddings::{Embedding, EmbeddingError, EmbeddingModel};
use tracing::{Instrument, debug_span, info_span};

/// Embedding model wrapper that waits for a rate limiter before every request.
///
/// Clones share the limiter, so the quota holds across every store using the
/// same model.
#[derive(Clone)]
pub struct RateLimitedEmbeddingModel<M: EmbeddingModel> {
    model: M,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl<M> RateLimitedEmbeddingModel<M>
where
    M: EmbeddingModel,
{
    pub fn new(model: M, limiter: DefaultDirectRateLimiter) -> Self {
        Self {
            model,
            limiter: Arc::new(limiter),
        }
    }

    /// Allow at most `requests` embedding requests per minute
    pub fn per_minute(model: M, requests: NonZeroU32) -> Self {
        Self::new(model, RateLimiter::direct(Quota::per_minute(requests)))
    }

    pub fn inner(&self) -> &M {
        &self.model
    }
}

impl<M: EmbeddingModel> EmbeddingModel for RateLimitedEmbeddingModel<M> {
    const MAX_DOCUMENTS: usize = M::MAX_DOCUMENTS;

    fn ndims(&self) -> usize {
        self.model.ndims()
    }

    async fn embed_texts(
        &self,
        texts: impl IntoIterator<Item = String> + Send,
    ) -> Result<Vec<Embedding>, EmbeddingError> {
        self.limiter
            .until_ready()
            .instrument(debug_span!("embedding_limiter"))
            .await;
        self.model
            .embed_texts(texts)
            .instrument(info_span!("embed_texts", ndims = self.model.ndims()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HashingEmbeddingModel;

    #[tokio::test]
    async fn test_delegates_to_inner_model() {
        let inner = HashingEmbeddingModel::new(16);
        let limited = RateLimitedEmbeddingModel::per_minute(inner.clone(), NonZeroU32::MIN);

        assert_eq!(limited.ndims(), 16);
        let embeddings = limited
            .embed_texts(vec!["index me".to_string()])
            .await
            .unwrap();
        let expected = inner.embed_texts(vec!["index me".to_string()]).await.unwrap();
        assert_eq!(embeddings[0].vec, expected[0].vec);
    }
}
