/// Public library interface for the Lesson Progress MCP server
///
/// This module exports the server implementation along with the domain,
/// storage and engine types so they can be used by other applications or
/// tests.

use std::path::PathBuf;
use thiserror::Error;

// Internal modules
mod domain;
mod engine;
mod mcp;
mod storage;
pub mod tools;

// Re-export public modules and types
pub use domain::*;
pub use engine::{
    CompletionOutcome, EngineConfig, EngineError, PathItem, ProgressionEngine, DEFAULT_MAX_ATTEMPTS,
};
pub use storage::{ProgressStorage, SqliteStorage, StorageError, LOOKUP_BATCH_SIZE};

/// Errors that can occur during server operation
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(#[from] storage::StorageError),

    #[error("Domain validation error: {0}")]
    Domain(#[from] domain::DomainError),

    #[error("Progression error: {0}")]
    Engine(#[from] engine::EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Main lesson progression server that implements the MCP protocol
///
/// This server keeps the lesson catalog and learner skill snapshots in a
/// SQLite database and exposes tools for curating lessons, listing the
/// lessons a learner can attempt, and recording completions.
pub struct ProgressionServer {
    storage: SqliteStorage,
    engine: ProgressionEngine,
    clock: Box<dyn Clock>,
}

impl ProgressionServer {
    /// Create a new server with the specified database path
    ///
    /// This will initialize the SQLite database with the required schema
    /// if it doesn't already exist.
    pub async fn new(db_path: PathBuf, config: EngineConfig) -> Result<Self, ServerError> {
        tracing::info!("Initializing Lesson Progress server with database: {:?}", db_path);

        let storage = SqliteStorage::new(db_path)?;

        Ok(Self::with_parts(storage, ProgressionEngine::new(config), Box::new(UtcClock)))
    }

    /// Assemble a server from already constructed parts
    pub fn with_parts(storage: SqliteStorage, engine: ProgressionEngine, clock: Box<dyn Clock>) -> Self {
        Self { storage, engine, clock }
    }

    /// Run the MCP server, handling JSON-RPC requests over stdin/stdout
    ///
    /// This method will block until the server is shut down or an error occurs.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Starting MCP server...");

        // Test database connectivity
        let lessons = self.storage.list_active_lessons()?;
        tracing::info!("Server started successfully, found {} active lessons", lessons.len());

        let mut mcp_server = mcp::McpServer::new(self);
        mcp_server.run().await?;

        Ok(())
    }

    /// Get a reference to the storage layer
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Get a reference to the progression engine
    pub fn engine(&self) -> &ProgressionEngine {
        &self.engine
    }

    /// Today's date according to the server clock
    pub fn today(&self) -> chrono::NaiveDate {
        self.clock.today()
    }
}
