use async_trait::async_trait;

use super::base::Tool;
use crate::errors::ToolResult;

pub const DISABLED_MESSAGE: &str =
    "Web search functionality is currently disabled for this deployment.";

/// Placeholder for the search engine integration; every query gets the same answer
pub struct WebSearch;

#[async_trait]
impl Tool for WebSearch {
    fn tag(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for a query written inside the block"
    }

    async fn execute(&self, _code: &str) -> ToolResult<String> {
        Ok(DISABLED_MESSAGE.to_string())
    }

    fn failed(&self, output: &str) -> bool {
        output.contains("Error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_search_is_disabled_but_not_failed() -> anyhow::Result<()> {
        let output = WebSearch.execute("rust async traits").await?;
        assert_eq!(output, DISABLED_MESSAGE);
        assert!(!WebSearch.failed(&output));
        assert!(WebSearch.feedback(&output).starts_with("[success]"));
        Ok(())
    }
}
