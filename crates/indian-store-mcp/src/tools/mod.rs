//! MCP tool implementations.
//!
//! Each tool declares its name, description and input schema for `tools/list`
//! and produces a text result for `tools/call`.

mod stores;

pub use stores::ListIndianStoresTool;

use crate::error::ToolResult;
use crate::server::oauth::Identity;

/// Tool execution context.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Authenticated caller, when the request passed the auth middleware.
    pub caller: Option<Identity>,
}

impl ToolContext {
    /// Create a context for an authenticated caller.
    #[must_use]
    pub fn new(caller: Option<Identity>) -> Self {
        Self { caller }
    }

    /// Caller subject for logging.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.caller
            .as_ref()
            .map_or("anonymous", |c| c.subject.as_str())
    }
}

/// Trait for MCP tools.
#[async_trait::async_trait]
pub trait McpTool: Send + Sync {
    /// Tool name (e.g., "list_indian_stores").
    fn name(&self) -> &'static str;

    /// Tool description for LLM.
    fn description(&self) -> &'static str;

    /// JSON Schema for input parameters.
    fn input_schema(&self) -> serde_json::Value;

    /// Execute the tool with given input.
    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String>;
}

/// Register all tools.
#[must_use]
pub fn register_all_tools() -> Vec<Box<dyn McpTool>> {
    vec![Box::new(ListIndianStoresTool)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_tool_names_are_unique() {
        let tools = register_all_tools();
        let mut names: Vec<_> = tools.iter().map(|t| t.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), tools.len());
    }

    #[test]
    fn test_context_subject() {
        assert_eq!(ToolContext::default().subject(), "anonymous");
        let ctx = ToolContext::new(Some(Identity {
            subject: "a@b.c".to_string(),
            ..Default::default()
        }));
        assert_eq!(ctx.subject(), "a@b.c");
    }
}
