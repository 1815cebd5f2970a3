//! `reqwest` implementation of [`DocsApi`] against Docs v1 and Drive v3.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::Credential;
use crate::config::GatewayConfig;
use crate::tools::args::{BatchUpdateRequest, CopyDocArgs};
use crate::upstream::{
    BatchUpdateResponse, DocsApi, Document, DocumentQuery, DriveFile, FileList, FileListQuery,
    UpstreamError,
};

const USER_AGENT: &str = concat!("gdocs-mcp/", env!("CARGO_PKG_VERSION"));

pub struct GoogleApiClient {
    http: reqwest::Client,
    docs_base_url: String,
    drive_base_url: String,
}

impl GoogleApiClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            docs_base_url: config.docs_base_url.trim_end_matches('/').to_string(),
            drive_base_url: config.drive_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn documents_url(&self, suffix: &str) -> String {
        format!("{}/v1/documents{suffix}", self.docs_base_url)
    }

    fn files_url(&self, suffix: &str) -> String {
        format!("{}/drive/v3/files{suffix}", self.drive_base_url)
    }

    /// Send, map non-2xx to [`UpstreamError::Status`], return the raw body.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, UpstreamError> {
        let resp = request.send().await.map_err(transport_error)?;
        let status = resp.status();
        let text = resp.text().await.map_err(transport_error)?;
        if !status.is_success() {
            let body = serde_json::from_str(&text).unwrap_or(Value::String(text));
            tracing::debug!(
                event = "upstream_request_failed",
                status = status.as_u16()
            );
            return Err(UpstreamError::status(status.as_u16(), body));
        }
        Ok(text)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, UpstreamError> {
        let text = self.send(request).await?;
        serde_json::from_str(&text).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

fn transport_error(err: reqwest::Error) -> UpstreamError {
    UpstreamError::Transport(err.to_string())
}

#[async_trait]
impl DocsApi for GoogleApiClient {
    async fn create_document(
        &self,
        credential: &Credential,
        title: &str,
    ) -> Result<Document, UpstreamError> {
        let request = self
            .http
            .post(self.documents_url(""))
            .bearer_auth(credential.access_token())
            .json(&serde_json::json!({ "title": title }));
        self.send_json(request).await
    }

    async fn get_document(
        &self,
        credential: &Credential,
        query: &DocumentQuery,
    ) -> Result<Document, UpstreamError> {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(include) = query.include_tabs_content {
            params.push(("includeTabsContent", include.to_string()));
        }
        if let Some(fields) = &query.fields {
            params.push(("fields", fields.clone()));
        }
        let url = self.documents_url(&format!("/{}", path_segment(&query.document_id)));
        let request = self
            .http
            .get(url)
            .bearer_auth(credential.access_token())
            .query(&params);
        self.send_json(request).await
    }

    async fn list_files(
        &self,
        credential: &Credential,
        query: &FileListQuery,
    ) -> Result<FileList, UpstreamError> {
        let request = self
            .http
            .get(self.files_url(""))
            .bearer_auth(credential.access_token())
            .query(&query.to_pairs());
        self.send_json(request).await
    }

    async fn batch_update(
        &self,
        credential: &Credential,
        document_id: &str,
        request: &BatchUpdateRequest,
    ) -> Result<Option<BatchUpdateResponse>, UpstreamError> {
        let url = self.documents_url(&format!("/{}:batchUpdate", path_segment(document_id)));
        let builder = self
            .http
            .post(url)
            .bearer_auth(credential.access_token())
            .json(request);
        let text = self.send(builder).await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }

    async fn copy_file(
        &self,
        credential: &Credential,
        request: &CopyDocArgs,
    ) -> Result<DriveFile, UpstreamError> {
        let url = self.files_url(&format!("/{}/copy", path_segment(&request.file_id)));
        let metadata = request.request_body.clone().unwrap_or_default();
        let builder = self
            .http
            .post(url)
            .bearer_auth(credential.access_token())
            .query(&request.query_pairs())
            .json(&metadata);
        self.send_json(builder).await
    }
}

/// Percent-encode an identifier for use as one path segment.
fn path_segment(raw: &str) -> String {
    url::form_urlencoded::byte_serialize(raw.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
