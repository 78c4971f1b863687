//! Where the indexing engine gets its documents from

use crate::document::Document;
use async_trait::async_trait;
use std::fmt;

/// Error returned by a [`DocumentLoader`]
pub type LoadError = Box<dyn std::error::Error + Send + Sync>;

/// Produces a finite sequence of documents on demand
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Load every document. A failure aborts the indexing run before any write.
    async fn load(&self) -> Result<Vec<Document>, LoadError>;
}

#[async_trait]
impl DocumentLoader for Vec<Document> {
    async fn load(&self) -> Result<Vec<Document>, LoadError> {
        Ok(self.clone())
    }
}

#[async_trait]
impl<L: DocumentLoader + ?Sized> DocumentLoader for Box<L> {
    async fn load(&self) -> Result<Vec<Document>, LoadError> {
        (**self).load().await
    }
}

/// Documents handed to the indexing engine: either already materialized or
/// pulled from a loader when the run starts
pub enum DocumentSource {
    /// A pre-supplied sequence
    Documents(Vec<Document>),
    /// A loader invoked once per run
    Loader(Box<dyn DocumentLoader>),
}

impl DocumentSource {
    /// Wrap a loader
    pub fn loader(loader: impl DocumentLoader + 'static) -> Self {
        Self::Loader(Box::new(loader))
    }

    /// Resolve into the sequence of documents
    pub async fn resolve(self) -> Result<Vec<Document>, LoadError> {
        match self {
            Self::Documents(documents) => Ok(documents),
            Self::Loader(loader) => loader.load().await,
        }
    }
}

impl From<Vec<Document>> for DocumentSource {
    fn from(documents: Vec<Document>) -> Self {
        Self::Documents(documents)
    }
}

impl fmt::Debug for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Documents(documents) => f
                .debug_tuple("Documents")
                .field(&documents.len())
                .finish(),
            Self::Loader(_) => f.write_str("Loader"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingLoader;

    #[async_trait]
    impl DocumentLoader for FailingLoader {
        async fn load(&self) -> Result<Vec<Document>, LoadError> {
            Err("site unreachable".into())
        }
    }

    #[tokio::test]
    async fn test_resolve_documents() {
        let source = DocumentSource::from(vec![Document::new("a"), Document::new("b")]);
        let docs = source.resolve().await.unwrap();
        assert_eq!(docs.len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_loader() {
        let source = DocumentSource::loader(vec![Document::new("a")]);
        assert_eq!(source.resolve().await.unwrap()[0].content, "a");

        let failing = DocumentSource::loader(FailingLoader);
        let err = failing.resolve().await.unwrap_err();
        assert_eq!(err.to_string(), "site unreachable");
    }
}
