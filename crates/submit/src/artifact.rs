use std::path::Path;

use crate::error::Result;

/// Opaque proof bytes, submitted unmodified as instruction data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofArtifact(Vec<u8>);

impl ProofArtifact {
    /// Wraps raw proof bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Reads a proof artifact from `path`.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self(tokio::fs::read(path).await?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for ProofArtifact {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for ProofArtifact {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
