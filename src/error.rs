//! Error types for the enrichment pipeline

use thiserror::Error;

/// Failure talking to the text-generation provider
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Network error, timeout, rate limit or 5xx. Worth retrying.
    #[error("transient provider failure: {0}")]
    Transient(String),

    /// Bad request, authentication failure or an unreadable response
    #[error("provider rejected the request: {0}")]
    Fatal(String),

    /// Every allowed attempt failed transiently
    #[error("provider still failing after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

/// Failure reported by the document store
#[derive(Error, Debug)]
pub enum StoreError {
    /// A tag with this slug already exists
    #[error("a tag with slug '{slug}' already exists")]
    Conflict { slug: String },

    #[error("not found: {0}")]
    NotFound(String),

    /// The record moved past the revision a guarded update expected
    #[error("asset {id} changed since revision {expected} (now {actual})")]
    Stale { id: String, expected: u64, actual: u64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Backing store could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Anything that escapes generation or reconciliation during an enrichment run
#[derive(Error, Debug)]
pub enum EnrichmentError {
    #[error("metadata generation failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_errors_are_transient() {
        assert!(ProviderError::Transient("503".to_string()).is_transient());
        assert!(!ProviderError::Fatal("401".to_string()).is_transient());

        let exhausted = ProviderError::RetriesExhausted {
            attempts: 3,
            source: Box::new(ProviderError::Transient("503".to_string())),
        };
        assert!(!exhausted.is_transient());
        assert_eq!(
            exhausted.to_string(),
            "provider still failing after 3 attempts: transient provider failure: 503"
        );
    }

    #[test]
    fn test_enrichment_error_wraps_sources() {
        let err: EnrichmentError = StoreError::Unavailable("connection refused".to_string()).into();
        assert!(matches!(err, EnrichmentError::Store(StoreError::Unavailable(_))));

        let err: EnrichmentError = ProviderError::Fatal("bad key".to_string()).into();
        assert!(err.to_string().contains("bad key"));
    }
}
