//! OutputFormat persistence seam.
//!
//! `AppState` holds an `Arc<dyn OutputFormatStore>`; the default backend keeps
//! records in process memory.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::OutputFormat;

#[async_trait]
pub trait OutputFormatStore: Send + Sync {
    /// Newest first by `created_at`.
    async fn list(&self) -> Result<Vec<OutputFormat>>;
    async fn get(&self, id: Uuid) -> Result<Option<OutputFormat>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<OutputFormat>>;
    async fn insert(&self, format: OutputFormat) -> Result<()>;
    /// Replaces the record with the same id. Returns false if there is none.
    async fn update(&self, format: OutputFormat) -> Result<bool>;
    async fn delete(&self, id: Uuid) -> Result<bool>;
}

#[derive(Default)]
pub struct InMemoryOutputFormatStore {
    formats: RwLock<HashMap<Uuid, OutputFormat>>,
}

impl InMemoryOutputFormatStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_formats(formats: impl IntoIterator<Item = OutputFormat>) -> Self {
        Self {
            formats: RwLock::new(formats.into_iter().map(|f| (f.id, f)).collect()),
        }
    }
}

#[async_trait]
impl OutputFormatStore for InMemoryOutputFormatStore {
    async fn list(&self) -> Result<Vec<OutputFormat>> {
        let mut formats: Vec<OutputFormat> = self.formats.read().await.values().cloned().collect();
        formats.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(formats)
    }

    async fn get(&self, id: Uuid) -> Result<Option<OutputFormat>> {
        Ok(self.formats.read().await.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<OutputFormat>> {
        Ok(self
            .formats
            .read()
            .await
            .values()
            .find(|f| f.name == name)
            .cloned())
    }

    async fn insert(&self, format: OutputFormat) -> Result<()> {
        self.formats.write().await.insert(format.id, format);
        Ok(())
    }

    async fn update(&self, format: OutputFormat) -> Result<bool> {
        let mut formats = self.formats.write().await;
        match formats.get_mut(&format.id) {
            Some(existing) => {
                *existing = format;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.formats.write().await.remove(&id).is_some())
    }
}
