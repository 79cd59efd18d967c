//! JSON-LD file schema provider
//!
//! Loads the data model once into an immutable catalog snapshot. Readers
//! clone the `Arc` and keep using their snapshot even while a reload swaps
//! in a new one.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use vocab_common::schema::load_jsonld;
use vocab_common::VocabularyCatalog;

use crate::collaborators::SchemaProvider;
use crate::error::{CurationError, CurationResult};

pub struct JsonLdSchemaProvider {
    path: Option<PathBuf>,
    snapshot: RwLock<Arc<VocabularyCatalog>>,
}

impl JsonLdSchemaProvider {
    /// Load the JSON-LD file at `path`
    ///
    /// Fails fast when the file is unreadable or malformed.
    pub async fn load(path: &Path) -> CurationResult<Self> {
        let catalog = read_catalog(path).await?;
        info!(path = %path.display(), attributes = catalog.len(), "Schema loaded");
        Ok(Self {
            path: Some(path.to_path_buf()),
            snapshot: RwLock::new(Arc::new(catalog)),
        })
    }

    /// Provider over an in-memory catalog (no file behind it)
    pub fn from_catalog(catalog: VocabularyCatalog) -> Self {
        Self {
            path: None,
            snapshot: RwLock::new(Arc::new(catalog)),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Re-read the schema file and swap in the new snapshot
    ///
    /// On failure the previous snapshot stays in place. Returns the number of
    /// attributes in the new catalog.
    pub async fn reload(&self) -> CurationResult<usize> {
        let path = self.path.as_deref().ok_or_else(|| {
            CurationError::Conflict("schema was not loaded from a file".to_string())
        })?;

        let catalog = read_catalog(path).await?;
        let attributes = catalog.len();
        *self.snapshot.write().await = Arc::new(catalog);

        info!(path = %path.display(), attributes, "Schema reloaded");
        Ok(attributes)
    }
}

async fn read_catalog(path: &Path) -> CurationResult<VocabularyCatalog> {
    let path = path.to_path_buf();
    let catalog = tokio::task::spawn_blocking(move || load_jsonld(&path)).await??;
    Ok(catalog)
}

#[async_trait::async_trait]
impl SchemaProvider for JsonLdSchemaProvider {
    async fn catalog(&self) -> Arc<VocabularyCatalog> {
        self.snapshot.read().await.clone()
    }
}
