/// MCP protocol implementation
///
/// This module speaks the Model Context Protocol over stdin/stdout and
/// routes tool calls to the lesson tools.

pub mod protocol;
pub mod server;

pub use server::McpServer;
