//! Document loading for referenced files

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

use crate::error::{CourierError, Result};

/// Source of referenced documents
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Read the named document as text, failing with `NotFound` when absent
    async fn load(&self, reference: &str) -> Result<String>;
}

/// Loads documents from the local filesystem, by path exactly as written
#[derive(Debug, Clone, Default)]
pub struct FsLoader {
    base_dir: Option<PathBuf>,
}

impl FsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative references against `base_dir` instead of the working directory
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    fn resolve(&self, reference: &str) -> PathBuf {
        let path = PathBuf::from(reference);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        }
    }
}

#[async_trait]
impl DocumentLoader for FsLoader {
    async fn load(&self, reference: &str) -> Result<String> {
        let path = self.resolve(reference);
        debug!("Loading document {} from {}", reference, path.display());

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(CourierError::NotFound(reference.to_string()))
            }
            Err(e) => Err(CourierError::Io {
                reference: reference.to_string(),
                source: e,
            }),
        }
    }
}

/// Load every reference in order, stopping at the first failure.
///
/// Either all documents load or none are returned.
pub async fn load_all(loader: &dyn DocumentLoader, references: &[String]) -> Result<Vec<String>> {
    let mut documents = Vec::with_capacity(references.len());
    for reference in references {
        let content = loader.load(reference).await?;
        debug!(
            "Read {} ({} bytes): {}...",
            reference,
            content.len(),
            content.chars().take(10).collect::<String>()
        );
        documents.push(content);
    }
    Ok(documents)
}
