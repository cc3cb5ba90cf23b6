//! Notion page text extraction.

use crate::connector::HttpConnector;
use crate::error::ConnectorError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::instrument;

/// Default Notion API host.
pub const NOTION_BASE_URL: &str = "https://api.notion.com";
/// Notion API version header value.
pub const NOTION_VERSION: &str = "2022-06-28";

/// A source of document text.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Returns the page title followed by the text of every block, joined by
    /// blank lines.
    async fn page_text(&self, page_id: &str) -> Result<String, ConnectorError>;
}

/// Concatenates a Notion rich-text array.
///
/// `text` items contribute `text.content`; mentions and equations contribute
/// their `plain_text`.
#[must_use]
pub fn rich_text(items: &JsonValue) -> String {
    let Some(items) = items.as_array() else {
        return String::new();
    };
    items
        .iter()
        .map(|item| {
            let field = if item["type"] == "text" {
                &item["text"]["content"]
            } else {
                &item["plain_text"]
            };
            field.as_str().unwrap_or_default()
        })
        .collect()
}

/// Extracts the readable text of one block.
///
/// Blocks with a `rich_text` field yield that text; `table_row` blocks yield
/// their cells joined by `" | "`. Anything else yields an empty string.
#[must_use]
pub fn block_text(block: &JsonValue) -> String {
    let Some(block_type) = block["type"].as_str() else {
        return String::new();
    };
    let content = &block[block_type];
    if content.get("rich_text").is_some() {
        rich_text(&content["rich_text"])
    } else if let Some(cells) = content["cells"].as_array() {
        cells.iter().map(rich_text).collect::<Vec<_>>().join(" | ")
    } else {
        String::new()
    }
}

/// Returns the text of the page's `title` property, if it has one.
#[must_use]
pub fn page_title(page: &JsonValue) -> String {
    page["properties"]
        .as_object()
        .and_then(|props| props.values().find(|prop| prop["type"] == "title"))
        .map(|prop| rich_text(&prop["title"]))
        .unwrap_or_default()
}

/// Joins a title and block texts, skipping blank parts.
#[must_use]
pub fn assemble_page_text(title: &str, blocks: &[JsonValue]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(blocks.len() + 1);
    if !title.is_empty() {
        parts.push(title.to_string());
    }
    parts.extend(
        blocks
            .iter()
            .map(block_text)
            .filter(|text| !text.trim().is_empty()),
    );
    parts.join("\n\n")
}

#[derive(Debug, Deserialize)]
struct BlockList {
    #[serde(default)]
    results: Vec<JsonValue>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

/// Notion REST client.
#[derive(Debug, Clone)]
pub struct NotionClient {
    connector: HttpConnector,
    token: String,
}

impl NotionClient {
    /// Creates a client for the given integration token.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectorError::InvalidConfig`] if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ConnectorError> {
        Ok(Self {
            connector: HttpConnector::new("notion", base_url, timeout)?
                .with_header("Notion-Version", NOTION_VERSION),
            token: token.into(),
        })
    }

    async fn all_blocks(&self, page_id: &str) -> Result<Vec<JsonValue>, ConnectorError> {
        let path = format!("/v1/blocks/{page_id}/children");
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut query = vec![("page_size", "100".to_string())];
            if let Some(ref c) = cursor {
                query.push(("start_cursor", c.clone()));
            }
            let list: BlockList = self
                .connector
                .get_json(&path, Some(&self.token), &query)
                .await?;
            blocks.extend(list.results);

            match (list.has_more, list.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(blocks)
    }
}

#[async_trait]
impl DocumentSource for NotionClient {
    #[instrument(skip(self))]
    async fn page_text(&self, page_id: &str) -> Result<String, ConnectorError> {
        let page: JsonValue = self
            .connector
            .get_json(&format!("/v1/pages/{page_id}"), Some(&self.token), &[])
            .await?;
        let blocks = self.all_blocks(page_id).await?;
        tracing::debug!(blocks = blocks.len(), "Fetched Notion page");
        Ok(assemble_page_text(&page_title(&page), &blocks))
    }
}
