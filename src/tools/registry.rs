//! Tool registry: holds registered tools, exposes their definitions to
//! providers, and dispatches calls by name.

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;
use tracing::{info, warn};

use crate::providers::ToolDefinition;

use super::{Tool, ToolContext};

/// A registry that holds and manages tools.
///
/// Tools can be registered, looked up by name, and executed with context.
/// Dispatch never fails at the type level: an unknown name produces an
/// `Error: Tool '<name>' not found` result string, which the agent loop
/// feeds back to the model like any other tool result.
///
/// # Example
///
/// ```rust
/// use std::collections::HashMap;
/// use ferrobot::tools::{ToolRegistry, ToolContext, EchoTool};
///
/// # tokio_test::block_on(async {
/// let mut registry = ToolRegistry::new();
/// registry.register(Box::new(EchoTool));
///
/// assert!(registry.has("echo"));
///
/// let mut args = HashMap::new();
/// args.insert("message".to_string(), "hello".to_string());
/// let result = registry.execute("echo", &args, &ToolContext::new()).await;
/// assert_eq!(result, "hello");
/// # });
/// ```
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. A tool with the same name is replaced.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        info!(tool = %name, "Registering tool");
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Check whether a tool with the given name is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Names of all registered tools.
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name.
    ///
    /// Returns the tool's result string. If no tool with `name` is
    /// registered, returns `Error: Tool '<name>' not found`.
    pub async fn execute(
        &self,
        name: &str,
        args: &HashMap<String, String>,
        ctx: &ToolContext,
    ) -> String {
        let tool = match self.tools.get(name) {
            Some(t) => t,
            None => {
                warn!(tool = name, "Tool not found");
                return format!("Error: Tool '{}' not found", name);
            }
        };

        let arg_keys: Vec<&str> = args.keys().map(|k| k.as_str()).collect();
        info!(tool = name, args = ?arg_keys, "Executing tool");

        let start = Instant::now();
        let result = tool.execute(args, ctx).await;

        info!(
            tool = name,
            duration_ms = start.elapsed().as_millis() as u64,
            result_len = result.len(),
            "Tool finished"
        );
        result
    }

    /// Tool definitions for use with LLM providers.
    ///
    /// Rebuilt on each call so registrations made after a loop starts
    /// are visible on the next turn.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters(),
            })
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Generic JSON Schema value for tools without parameters.
pub fn empty_parameters() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}
