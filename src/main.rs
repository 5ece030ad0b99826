/// Main entry point for the Lesson Progress MCP server
///
/// This file sets up logging, parses command line arguments, and starts the MCP server.
/// The server listens for JSON-RPC requests over stdin/stdout following the MCP protocol.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lesson_progress_mcp::{EngineConfig, ProgressionServer, DEFAULT_MAX_ATTEMPTS};

/// Get the default database path with robust fallback strategy
fn get_default_database_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    // Try various locations in order of preference
    let potential_paths = [
        dirs::home_dir().map(|mut p| {
            p.push(".lesson_progress");
            p
        }),
        dirs::data_dir().map(|mut p| {
            p.push("lesson_progress");
            p
        }),
        dirs::config_dir().map(|mut p| {
            p.push("lesson_progress");
            p
        }),
        std::env::current_dir().ok().map(|mut p| {
            p.push(".lesson_progress");
            p
        }),
    ];

    for potential_path in potential_paths.iter().flatten() {
        if let Ok(()) = std::fs::create_dir_all(potential_path) {
            // Test if we can write to this directory
            let test_file = potential_path.join(".test_write");
            if std::fs::write(&test_file, "test").is_ok() {
                let _ = std::fs::remove_file(&test_file);
                return Ok(potential_path.join("progress.db"));
            }
        }
    }

    // Ultimate fallback: use a temporary directory
    let mut temp_path = std::env::temp_dir();
    temp_path.push("lesson_progress");
    std::fs::create_dir_all(&temp_path)?;
    temp_path.push("progress.db");

    tracing::warn!("Using temporary directory for database: {}", temp_path.display());
    Ok(temp_path)
}

/// Command line arguments for the Lesson Progress MCP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    /// If not provided, uses a default location in the user's home directory
    #[arg(long, env = "LESSON_PROGRESS_DB")]
    database: Option<PathBuf>,

    /// Attempts at a contended skill snapshot write before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_attempts: u32,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        "warn"
    };

    // RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lesson_progress_mcp={}", log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr) // stdout carries JSON-RPC
        .init();

    info!("Starting Lesson Progress MCP server");

    let db_path = match args.database {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            path
        }
        None => get_default_database_path()?,
    };

    info!("Using database at: {}", db_path.display());

    let config = EngineConfig { max_attempts: args.max_attempts.max(1) };
    let server = ProgressionServer::new(db_path, config).await?;

    server.run().await?;

    info!("Lesson Progress MCP server shutdown complete");
    Ok(())
}
