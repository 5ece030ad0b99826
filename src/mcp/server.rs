/// MCP server implementation that handles JSON-RPC communication
///
/// This module implements the actual MCP server that:
/// 1. Reads JSON-RPC requests from stdin
/// 2. Processes tool calls against the lesson catalog and learner progress
/// 3. Sends JSON-RPC responses to stdout

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::mcp::protocol::*;
use crate::tools;
use crate::{ProgressionServer, ServerError};

/// MCP server that handles communication with the client
pub struct McpServer {
    /// The underlying lesson progression server
    progression: ProgressionServer,
    /// Whether the client has finished initialization
    initialized: bool,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(progression: ProgressionServer) -> Self {
        Self {
            progression,
            initialized: false,
        }
    }

    /// Run the MCP server, handling JSON-RPC over stdin/stdout
    pub async fn run(&mut self) -> Result<(), ServerError> {
        info!("Starting MCP server, waiting for JSON-RPC requests...");

        let stdin = tokio::io::stdin();
        let mut reader = BufReader::new(stdin);
        let mut stdout = tokio::io::stdout();

        let mut line = String::new();

        loop {
            line.clear();

            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!("MCP server shutting down (stdin closed)");
                    break;
                }
                Ok(_) => {
                    if let Some(response) = self.process_line(&line).await {
                        let response_str = serde_json::to_string(&response)?;

                        stdout.write_all(response_str.as_bytes()).await?;
                        stdout.write_all(b"\n").await?;
                        stdout.flush().await?;

                        debug!("Sent response: {}", response_str);
                    }
                }
                Err(e) => {
                    error!("Failed to read from stdin: {}", e);
                    break;
                }
            }
        }

        Ok(())
    }

    /// Process a single line of JSON-RPC input
    ///
    /// Returns `None` for blank lines and notifications.
    pub(crate) async fn process_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        debug!("Processing request: {}", line);

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    error_codes::PARSE_ERROR,
                    format!("Invalid JSON: {}", e),
                    None,
                ));
            }
        };

        let Some(id) = request.id.clone() else {
            self.handle_notification(&request.method);
            return None;
        };

        Some(self.handle_request(id, request).await)
    }

    fn handle_notification(&mut self, method: &str) {
        match method {
            "initialized" | "notifications/initialized" => {
                self.initialized = true;
                info!("MCP client finished initialization");
            }
            other => debug!("Ignoring notification '{}'", other),
        }
    }

    /// Handle a JSON-RPC request
    async fn handle_request(&mut self, id: Value, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, request.params),
            _ => JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method '{}' not found", request.method),
                None,
            ),
        }
    }

    /// Handle MCP initialization request
    fn handle_initialize(&mut self, id: Value) -> JsonRpcResponse {
        info!("MCP client connected");

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: "Lesson Progress MCP".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        respond(id, &result)
    }

    /// Handle tools/list request
    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        let tools = vec![
            tool::<tools::CreateLessonParams>(
                "lesson_create",
                "Add a lesson to the catalog with skill prerequisites and completion rewards",
            ),
            tool::<tools::UpdateLessonParams>(
                "lesson_update",
                "Change an existing lesson; omitted fields keep their current values",
            ),
            tool::<tools::DeleteLessonParams>("lesson_delete", "Remove a lesson from the catalog"),
            tool::<tools::ListLessonsParams>(
                "lesson_list",
                "List the lesson catalog in order, optionally filtered by language or active state",
            ),
            tool::<tools::AvailableLessonsParams>(
                "lesson_available",
                "List the lessons a learner can attempt now, or their whole path with locked lessons",
            ),
            tool::<tools::CompleteLessonParams>(
                "lesson_complete",
                "Record that a learner completed a lesson, applying skill gains, XP and streak",
            ),
            tool::<tools::SkillsStatusParams>(
                "skills_status",
                "Show a learner's skill levels, XP, streak and completed lessons",
            ),
        ];

        respond(id, &json!({ "tools": tools }))
    }

    /// Handle tools/call request
    fn handle_tools_call(&mut self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let tool_params: ToolCallParams = match params {
            Some(params) => match serde_json::from_value(params) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        error_codes::INVALID_PARAMS,
                        format!("Invalid parameters: {}", e),
                        None,
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    "Missing parameters".to_string(),
                    None,
                );
            }
        };

        if !self.initialized {
            warn!("Tool '{}' called before initialization completed", tool_params.name);
        }

        let args = tool_params.arguments;
        let result = match tool_params.name.as_str() {
            "lesson_create" => self.call_lesson_create(args),
            "lesson_update" => self.call_lesson_update(args),
            "lesson_delete" => self.call_lesson_delete(args),
            "lesson_list" => self.call_lesson_list(args),
            "lesson_available" => self.call_lesson_available(args),
            "lesson_complete" => self.call_lesson_complete(args),
            "skills_status" => self.call_skills_status(args),
            _ => ToolCallResult::error(format!("Unknown tool: {}", tool_params.name)),
        };

        respond(id, &result)
    }

    /// Call the lesson_create tool
    fn call_lesson_create(&self, args: Map<String, Value>) -> ToolCallResult {
        let params = match parse_args::<tools::CreateLessonParams>(args) {
            Ok(p) => p,
            Err(result) => return result,
        };

        match tools::create_lesson(self.progression.storage(), params) {
            Ok(response) => ToolCallResult::success(format!(
                "{}\nLesson ID: {}",
                response.message, response.lesson_id
            )),
            Err(e) => tool_failure("lesson_create", e),
        }
    }

    /// Call the lesson_update tool
    fn call_lesson_update(&self, args: Map<String, Value>) -> ToolCallResult {
        let params = match parse_args::<tools::UpdateLessonParams>(args) {
            Ok(p) => p,
            Err(result) => return result,
        };

        match tools::update_lesson(self.progression.storage(), params) {
            Ok(response) => ToolCallResult::success(response.message),
            Err(e) => tool_failure("lesson_update", e),
        }
    }

    /// Call the lesson_delete tool
    fn call_lesson_delete(&self, args: Map<String, Value>) -> ToolCallResult {
        let params = match parse_args::<tools::DeleteLessonParams>(args) {
            Ok(p) => p,
            Err(result) => return result,
        };

        match tools::delete_lesson(self.progression.storage(), params) {
            Ok(response) => ToolCallResult::success(response.message),
            Err(e) => tool_failure("lesson_delete", e),
        }
    }

    /// Call the lesson_list tool
    fn call_lesson_list(&self, args: Map<String, Value>) -> ToolCallResult {
        let params = match parse_args::<tools::ListLessonsParams>(args) {
            Ok(p) => p,
            Err(result) => return result,
        };

        match tools::list_lessons(self.progression.storage(), params) {
            Ok(response) => {
                if response.lessons.is_empty() {
                    return ToolCallResult::success(
                        "No lessons found. Create the first lesson to get started!".to_string(),
                    );
                }

                let header = format!(
                    "📚 **Lesson Catalog** ({} lessons, {} active)\n\n",
                    response.total, response.active
                );

                let detailed_list = response
                    .lessons
                    .iter()
                    .map(|l| {
                        let r = &l.requirements;
                        let g = &l.gains;
                        format!(
                            "{}. **{}** ({}, level {}){}\n   🔑 Needs: V{} G{} R{} W{} | 📈 Gains: V+{} G+{} R+{} W+{} | ⭐ {} XP\n   ID: {}",
                            l.order,
                            l.title,
                            l.language,
                            l.level,
                            if l.is_active { "" } else { " ⏸️ (inactive)" },
                            r.vocabulary,
                            r.grammar,
                            r.reading,
                            r.writing,
                            g.vocabulary,
                            g.grammar,
                            g.reading,
                            g.writing,
                            l.xp_reward,
                            l.lesson_id
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n\n");

                ToolCallResult::success(format!("{}{}", header, detailed_list))
            }
            Err(e) => tool_failure("lesson_list", e),
        }
    }

    /// Call the lesson_available tool
    fn call_lesson_available(&self, args: Map<String, Value>) -> ToolCallResult {
        let params = match parse_args::<tools::AvailableLessonsParams>(args) {
            Ok(p) => p,
            Err(result) => return result,
        };

        match tools::available_lessons(self.progression.storage(), self.progression.engine(), params) {
            Ok(response) => ToolCallResult::success(response.message),
            Err(e) => tool_failure("lesson_available", e),
        }
    }

    /// Call the lesson_complete tool
    fn call_lesson_complete(&self, args: Map<String, Value>) -> ToolCallResult {
        let params = match parse_args::<tools::CompleteLessonParams>(args) {
            Ok(p) => p,
            Err(result) => return result,
        };

        match tools::record_completion(
            self.progression.storage(),
            self.progression.engine(),
            self.progression.today(),
            params,
        ) {
            Ok(response) => ToolCallResult::success(response.message),
            Err(e) => tool_failure("lesson_complete", e),
        }
    }

    /// Call the skills_status tool
    fn call_skills_status(&self, args: Map<String, Value>) -> ToolCallResult {
        let params = match parse_args::<tools::SkillsStatusParams>(args) {
            Ok(p) => p,
            Err(result) => return result,
        };

        match tools::skills_status(self.progression.storage(), self.progression.engine(), params) {
            Ok(response) => ToolCallResult::success(response.message),
            Err(e) => tool_failure("skills_status", e),
        }
    }
}

/// Build a tool definition whose input schema is derived from its params type
fn tool<T: JsonSchema>(name: &str, description: &str) -> ToolDefinition {
    let schema = schemars::schema_for!(T);
    let input_schema = serde_json::to_value(schema).unwrap_or_else(|e| {
        error!("Failed to serialize schema for {}: {}", name, e);
        json!({ "type": "object" })
    });

    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

/// Deserialize tool arguments into their params type
fn parse_args<T: DeserializeOwned>(args: Map<String, Value>) -> Result<T, ToolCallResult> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| ToolCallResult::error(format!("Invalid arguments: {}", e)))
}

fn tool_failure(tool: &str, error: ServerError) -> ToolCallResult {
    warn!("Tool {} failed: {}", tool, error);
    ToolCallResult::failure(&error)
}

fn respond<T: Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(
            id,
            error_codes::INTERNAL_ERROR,
            format!("Failed to serialize result: {}", e),
            None,
        ),
    }
}
