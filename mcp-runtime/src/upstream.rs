//! The remote document service as the gateway sees it.
//!
//! [`DocsApi`] is the only seam between tool handlers and the network. The
//! production implementation lives in [`crate::google`]; tests substitute
//! in-memory fakes.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::auth::Credential;
use crate::tools::args::{BatchUpdateRequest, CopyDocArgs};

#[async_trait]
pub trait DocsApi: Send + Sync {
    async fn create_document(
        &self,
        credential: &Credential,
        title: &str,
    ) -> Result<Document, UpstreamError>;

    async fn get_document(
        &self,
        credential: &Credential,
        query: &DocumentQuery,
    ) -> Result<Document, UpstreamError>;

    async fn list_files(
        &self,
        credential: &Credential,
        query: &FileListQuery,
    ) -> Result<FileList, UpstreamError>;

    /// `Ok(None)` when the service answered with an empty body.
    async fn batch_update(
        &self,
        credential: &Credential,
        document_id: &str,
        request: &BatchUpdateRequest,
    ) -> Result<Option<BatchUpdateResponse>, UpstreamError>;

    async fn copy_file(
        &self,
        credential: &Credential,
        request: &CopyDocArgs,
    ) -> Result<DriveFile, UpstreamError>;
}

/// Failure of one upstream operation, before classification.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// The service answered with a non-success status.
    #[error("request failed with status {status}")]
    Status { status: u16, body: Value },
    #[error("Operation timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("{0}")]
    Transport(String),
    #[error("{0}")]
    Decode(String),
    /// Nothing usable is known about the failure.
    #[error("unknown upstream failure")]
    Opaque,
}

impl UpstreamError {
    pub fn status(status: u16, body: Value) -> Self {
        UpstreamError::Status { status, body }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentQuery {
    pub document_id: String,
    pub include_tabs_content: Option<bool>,
    pub fields: Option<String>,
}

/// Drive `files.list` parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileListQuery {
    pub q: String,
    pub fields: String,
    pub order_by: Option<String>,
    pub page_size: u32,
    pub page_token: Option<String>,
    pub spaces: Option<String>,
    pub all_drives: bool,
}

impl FileListQuery {
    /// Flatten into query-string pairs in a stable order.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("q", self.q.clone()),
            ("fields", self.fields.clone()),
            ("pageSize", self.page_size.to_string()),
        ];
        if let Some(order_by) = &self.order_by {
            pairs.push(("orderBy", order_by.clone()));
        }
        if let Some(page_token) = &self.page_token {
            pairs.push(("pageToken", page_token.clone()));
        }
        if let Some(spaces) = &self.spaces {
            pairs.push(("spaces", spaces.clone()));
        }
        if self.all_drives {
            pairs.push(("supportsAllDrives", "true".to_string()));
            pairs.push(("includeItemsFromAllDrives", "true".to_string()));
            pairs.push(("corpora", "allDrives".to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    pub document_id: Option<String>,
    pub title: Option<String>,
    pub revision_id: Option<String>,
    pub body: Option<Body>,
    pub tabs: Vec<Tab>,
    pub headers: BTreeMap<String, Value>,
    pub footers: BTreeMap<String, Value>,
    pub inline_objects: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Body {
    pub content: Vec<StructuralElement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StructuralElement {
    pub paragraph: Option<Paragraph>,
    pub table: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Paragraph {
    pub elements: Vec<ParagraphElement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParagraphElement {
    pub text_run: Option<TextRun>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextRun {
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tab {
    pub tab_properties: Option<TabProperties>,
    pub document_tab: Option<DocumentTab>,
    pub child_tabs: Vec<Tab>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TabProperties {
    pub tab_id: Option<String>,
    pub title: Option<String>,
    pub index: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentTab {
    pub body: Option<Body>,
    pub headers: BTreeMap<String, Value>,
    pub footers: BTreeMap<String, Value>,
    pub inline_objects: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileList {
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriveFile {
    pub id: Option<String>,
    pub name: Option<String>,
    pub kind: Option<String>,
    pub mime_type: Option<String>,
    pub created_time: Option<String>,
    pub modified_time: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchUpdateResponse {
    pub document_id: Option<String>,
    pub replies: Vec<Value>,
    pub write_control: Option<WriteControl>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteControl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_revision_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_revision_id: Option<String>,
}
