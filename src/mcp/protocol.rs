/// MCP (Model Context Protocol) message structures and JSON-RPC handling
///
/// This module defines the JSON-RPC message format that MCP clients use to
/// communicate with the lesson progress server.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::engine::EngineError;
use crate::storage::StorageError;
use crate::ServerError;

/// MCP protocol version we support
pub const MCP_VERSION: &str = "2024-11-05";

/// JSON-RPC 2.0 request message
///
/// Notifications carry no `id` and get no response.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0")
    #[allow(dead_code)]
    pub jsonrpc: String,
    /// Unique identifier for this request; absent for notifications
    #[serde(default)]
    pub id: Option<Value>,
    /// The method to call (e.g., "tools/call")
    pub method: String,
    /// Parameters for the method call
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response message
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Request ID that we're responding to
    pub id: Value,
    /// Successful result (if no error occurred)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error information (if something went wrong)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error information
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// MCP tool call parameters
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call (e.g., "lesson_complete")
    pub name: String,
    /// Arguments to pass to the tool
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// MCP tool call result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    pub is_error: bool,
    /// Application error code when `is_error` is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i32>,
}

/// Content returned by a tool
#[derive(Debug, Serialize)]
pub struct ToolContent {
    /// Type of content (usually "text")
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// MCP tool definition
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema for the tool's input parameters
    pub input_schema: Value,
}

/// MCP server capabilities
#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

/// Tools capability information
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    pub list_changed: bool,
}

/// MCP initialization response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

/// Information about this server
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

// JSON-RPC error codes
pub mod error_codes {
    /// Parse error - Invalid JSON was received by the server
    pub const PARSE_ERROR: i32 = -32700;
    /// Method not found - The requested method doesn't exist
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid parameters - Method exists but parameters are wrong
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error - Internal JSON-RPC error
    pub const INTERNAL_ERROR: i32 = -32603;

    // Application-specific codes (-32000 to -32099)
    /// The specified lesson doesn't exist
    pub const LESSON_NOT_FOUND: i32 = -32001;
    /// A lesson with this id already exists
    pub const DUPLICATE_LESSON: i32 = -32002;
    /// Input validation failed
    pub const VALIDATION_ERROR: i32 = -32003;
    /// Database or storage operation failed
    pub const STORAGE_ERROR: i32 = -32004;
    /// The learner's snapshot kept changing underneath the completion
    pub const REVISION_CONFLICT: i32 = -32005;
}

impl JsonRpcResponse {
    /// Create a successful response
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Value, code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError { code, message, data }),
        }
    }
}

impl ToolCallResult {
    /// Create a successful tool result with text content
    pub fn success(text: String) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text,
            }],
            is_error: false,
            error_code: None,
        }
    }

    /// Create an error tool result from a failed tool call
    pub fn failure(error: &ServerError) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text: format!("Error: {}", error),
            }],
            is_error: true,
            error_code: Some(server_error_code(error)),
        }
    }

    /// Create an error tool result with a plain message
    pub fn error(error_message: String) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text: format!("Error: {}", error_message),
            }],
            is_error: true,
            error_code: Some(error_codes::INVALID_PARAMS),
        }
    }
}

/// Map storage errors to JSON-RPC error codes
pub fn storage_error_code(error: &StorageError) -> i32 {
    match error {
        StorageError::LessonNotFound { .. } => error_codes::LESSON_NOT_FOUND,
        StorageError::DuplicateLesson { .. } => error_codes::DUPLICATE_LESSON,
        StorageError::RevisionConflict { .. } => error_codes::REVISION_CONFLICT,
        StorageError::Query(_)
        | StorageError::Connection(_)
        | StorageError::InvalidData(_)
        | StorageError::Migration(_) => error_codes::STORAGE_ERROR,
        StorageError::Serialization(_) => error_codes::INTERNAL_ERROR,
    }
}

/// Map any server error to a JSON-RPC error code
pub fn server_error_code(error: &ServerError) -> i32 {
    match error {
        ServerError::Database(e) => storage_error_code(e),
        ServerError::Domain(_) => error_codes::VALIDATION_ERROR,
        ServerError::Engine(EngineError::Storage(e)) => storage_error_code(e),
        ServerError::Engine(EngineError::Domain(_)) => error_codes::VALIDATION_ERROR,
        ServerError::Engine(EngineError::ConflictRetriesExhausted { .. }) => {
            error_codes::REVISION_CONFLICT
        }
        ServerError::Io(_) | ServerError::Json(_) => error_codes::INTERNAL_ERROR,
    }
}
