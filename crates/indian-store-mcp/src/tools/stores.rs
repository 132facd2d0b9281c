//! Store catalog tool: list_indian_stores.

use serde_json::json;

use super::{McpTool, ToolContext};
use crate::error::{ToolError, ToolResult};

/// Popular Indian online stores.
const STORES: [&str; 6] = [
    "1. Flipkart - E-commerce platform offering electronics, fashion, home essentials",
    "2. Amazon India - Global e-commerce platform with wide product range",
    "3. Reliance Digital - Electronics and appliances retailer",
    "4. Myntra - Fashion and lifestyle e-commerce platform",
    "5. Snapdeal - E-commerce platform with various product categories",
    "6. Tata CLiQ - Digital commerce platform by Tata Group",
];

/// Lists popular Indian online stores.
pub struct ListIndianStoresTool;

#[async_trait::async_trait]
impl McpTool for ListIndianStoresTool {
    fn name(&self) -> &'static str {
        "list_indian_stores"
    }

    fn description(&self) -> &'static str {
        "List popular Indian online stores with their services"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        if !(input.is_object() || input.is_null()) {
            return Err(ToolError::validation("arguments", "must be an object"));
        }

        tracing::debug!(caller = %ctx.subject(), "Listing Indian stores");
        Ok(STORES.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lists_six_stores() {
        let text = ListIndianStoresTool
            .execute(&ToolContext::default(), json!({}))
            .await
            .unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("1. Flipkart - E-commerce platform"));
        assert_eq!(
            lines[5],
            "6. Tata CLiQ - Digital commerce platform by Tata Group"
        );
    }

    #[tokio::test]
    async fn test_rejects_non_object_arguments() {
        let err = ListIndianStoresTool
            .execute(&ToolContext::default(), json!("stores"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation { .. }));
    }
}
