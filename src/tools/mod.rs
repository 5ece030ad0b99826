/// MCP tools for lesson progression
///
/// This module contains all the MCP tools that external clients can call
/// to curate the lesson catalog and to move learners through it.

pub mod available;
pub mod complete;
pub mod create;
pub mod list;
pub mod status;
pub mod update;

// Re-export tool functions for easy access
pub use available::*;
pub use complete::*;
pub use create::*;
pub use list::*;
pub use status::*;
pub use update::*;
