use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::definition::{LoadError, SessionDefinition};
use crate::env::EnvironmentVar;
use crate::model::Session;

/// Boundary to wherever definitions live. Implementations only fetch
/// raw documents; parsing and validation stay in the store.
#[async_trait]
pub trait DefinitionSource {
    async fn fetch(&self, definition_id: u32) -> Result<String, LoadError>;
}

/// Reads `session{NNN}.json` files under a base directory.
pub struct FsDefinitionSource {
    base_dir: PathBuf,
}

impl FsDefinitionSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    pub fn from_env() -> Self {
        Self::new(EnvironmentVar::load().definition_dir)
    }
}

#[async_trait]
impl DefinitionSource for FsDefinitionSource {
    async fn fetch(&self, definition_id: u32) -> Result<String, LoadError> {
        let path = self.base_dir.join(format!("session{:03}.json", definition_id));
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| LoadError::DefinitionNotFound(path.display().to_string()))
    }
}

/// In-memory documents keyed by definition id, for demos and tests.
#[derive(Default)]
pub struct MemoryDefinitionSource {
    documents: HashMap<u32, String>,
}

impl MemoryDefinitionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, definition_id: u32, document: String) {
        self.documents.insert(definition_id, document);
    }
}

#[async_trait]
impl DefinitionSource for MemoryDefinitionSource {
    async fn fetch(&self, definition_id: u32) -> Result<String, LoadError> {
        self.documents
            .get(&definition_id)
            .cloned()
            .ok_or_else(|| LoadError::DefinitionNotFound(format!("definition {definition_id}")))
    }
}

pub struct SessionStore {
    source: Box<dyn DefinitionSource + Send + Sync>,
}

impl SessionStore {
    pub fn new(source: impl DefinitionSource + Send + Sync + 'static) -> Self {
        Self { source: Box::new(source) }
    }

    /// Fetches, parses and validates a definition. A failure leaves any
    /// previously loaded session with the caller, untouched.
    pub async fn load(&self, definition_id: u32) -> Result<Session, LoadError> {
        let raw = self.source.fetch(definition_id).await?;
        let definition: SessionDefinition = serde_json::from_str(&raw)
            .map_err(|err| LoadError::Malformed(err.to_string()))?;
        let session = definition.into_session()?;
        log::info!(
            "loaded session '{}': {} designers, {} training / {} scored rounds",
            session.name,
            session.num_designers,
            session.training.len(),
            session.scored.len(),
        );
        Ok(session)
    }
}
