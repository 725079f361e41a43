//! Driven port for the external image hosting service.
//!
//! Avatar bytes are never persisted locally; the host stores them and the
//! team record keeps only the returned URL.

use async_trait::async_trait;

/// Errors raised by image host adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageHostError {
    /// The host rejected the image.
    #[error("image host rejected the upload: {message}")]
    Rejected {
        /// Host-supplied diagnostic.
        message: String,
    },

    /// The host could not be reached.
    #[error("image host unreachable: {message}")]
    Unavailable {
        /// Transport diagnostic.
        message: String,
    },
}

impl ImageHostError {
    /// Create a rejected error with the given message.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    /// Create an unavailable error with the given message.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }
}

/// Port for hosting uploaded avatar images.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload raw image bytes and return the public URL.
    async fn upload(&self, image: Vec<u8>) -> Result<String, ImageHostError>;
}

/// In-memory image host that returns a deterministic URL per upload.
#[derive(Debug, Default)]
pub struct FixtureImageHost {
    uploads: std::sync::Mutex<Vec<usize>>,
}

impl FixtureImageHost {
    /// Number of uploads performed so far.
    ///
    /// # Panics
    ///
    /// Panics when a previous caller poisoned the internal mutex.
    pub fn upload_count(&self) -> usize {
        self.uploads.lock().map(|u| u.len()).unwrap_or_else(|_| {
            panic!("fixture image host mutex poisoned");
        })
    }
}

#[async_trait]
impl ImageHost for FixtureImageHost {
    async fn upload(&self, image: Vec<u8>) -> Result<String, ImageHostError> {
        if image.is_empty() {
            return Err(ImageHostError::rejected("empty image body"));
        }
        let mut uploads = self
            .uploads
            .lock()
            .map_err(|_| ImageHostError::unavailable("fixture mutex poisoned"))?;
        uploads.push(image.len());
        Ok(format!("https://images.invalid/fixture/{}", uploads.len()))
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;

    #[tokio::test]
    async fn fixture_host_returns_distinct_urls() {
        let host = FixtureImageHost::default();
        let first = host.upload(vec![0xFF; 16]).await.expect("upload succeeds");
        let second = host.upload(vec![0xFF; 16]).await.expect("upload succeeds");
        assert_ne!(first, second);
        assert_eq!(host.upload_count(), 2);
    }

    #[tokio::test]
    async fn fixture_host_rejects_empty_bodies() {
        let host = FixtureImageHost::default();
        let err = host.upload(Vec::new()).await.expect_err("empty body fails");
        assert!(matches!(err, ImageHostError::Rejected { .. }));
    }
}
