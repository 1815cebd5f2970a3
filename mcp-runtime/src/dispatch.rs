//! Name → descriptor → validate → authenticate → handler.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::Instrument;

use crate::error::GatewayError;
use crate::gatekeeper::Gatekeeper;
use crate::tools::handler::ToolHandler;
use crate::tools::{ToolDescriptor, ToolResult, descriptor, registry};
use crate::upstream::DocsApi;

pub struct Dispatcher {
    api: Arc<dyn DocsApi>,
    gatekeeper: Gatekeeper,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(api: Arc<dyn DocsApi>, gatekeeper: Gatekeeper, timeout: Duration) -> Self {
        Self {
            api,
            gatekeeper,
            timeout,
        }
    }

    pub fn gatekeeper(&self) -> &Gatekeeper {
        &self.gatekeeper
    }

    pub fn list_tool_descriptors(&self) -> &'static [ToolDescriptor] {
        registry()
    }

    pub async fn dispatch(&self, name: &str, raw: &Value) -> Result<ToolResult, GatewayError> {
        let span = tracing::info_span!(
            "tool_call",
            tool = name,
            channel = self.gatekeeper.channel().as_str()
        );
        let started = Instant::now();
        let outcome = self.dispatch_inner(name, raw).instrument(span.clone()).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        span.in_scope(|| match &outcome {
            Ok(_) => tracing::info!(event = "tool_call_completed", latency_ms),
            Err(err) => tracing::warn!(
                event = "tool_call_failed",
                latency_ms,
                kind = err.code(),
                retryable = err.retryable(),
                error = %err
            ),
        });
        outcome
    }

    async fn dispatch_inner(&self, name: &str, raw: &Value) -> Result<ToolResult, GatewayError> {
        let tool = descriptor(name).ok_or_else(|| GatewayError::UnknownTool(name.to_string()))?;
        let args = tool
            .validate(raw)
            .map_err(|errors| GatewayError::Validation {
                tool: name.to_string(),
                errors,
            })?;
        let credential = self.gatekeeper.ensure_authenticated().await?;
        let result = ToolHandler::new(self.api.as_ref(), credential, self.timeout)
            .run(args)
            .await?;
        Ok(result)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::Ordering;

    use async_trait::async_trait;
    use gdocs_core::ErrorKind;
    use serde_json::json;

    use super::*;
    use crate::auth::Credential;
    use crate::gatekeeper::Channel;
    use crate::gatekeeper::tests::FakeAuth;
    use crate::tools::args::{BatchUpdateRequest, CopyDocArgs};
    use crate::upstream::{
        BatchUpdateResponse, Document, DocumentQuery, DriveFile, FileList, FileListQuery,
        UpstreamError,
    };

    /// In-memory [`DocsApi`] that records which operations ran.
    #[derive(Default)]
    pub(crate) struct FakeDocsApi {
        pub calls: Mutex<Vec<&'static str>>,
        pub get_error: Option<UpstreamError>,
    }

    impl FakeDocsApi {
        fn record(&self, op: &'static str) {
            self.calls.lock().unwrap().push(op);
        }

        pub(crate) fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DocsApi for FakeDocsApi {
        async fn create_document(
            &self,
            _credential: &Credential,
            title: &str,
        ) -> Result<Document, UpstreamError> {
            self.record("create_document");
            Ok(Document {
                document_id: Some("1AbC".to_string()),
                title: Some(title.to_string()),
                ..Document::default()
            })
        }

        async fn get_document(
            &self,
            _credential: &Credential,
            query: &DocumentQuery,
        ) -> Result<Document, UpstreamError> {
            self.record("get_document");
            if let Some(err) = &self.get_error {
                return Err(err.clone());
            }
            Ok(Document {
                document_id: Some(query.document_id.clone()),
                ..Document::default()
            })
        }

        async fn list_files(
            &self,
            _credential: &Credential,
            _query: &FileListQuery,
        ) -> Result<FileList, UpstreamError> {
            self.record("list_files");
            Ok(FileList::default())
        }

        async fn batch_update(
            &self,
            _credential: &Credential,
            document_id: &str,
            request: &BatchUpdateRequest,
        ) -> Result<Option<BatchUpdateResponse>, UpstreamError> {
            self.record("batch_update");
            Ok(Some(BatchUpdateResponse {
                document_id: Some(document_id.to_string()),
                replies: vec![json!({}); request.requests.len()],
                write_control: None,
            }))
        }

        async fn copy_file(
            &self,
            _credential: &Credential,
            request: &CopyDocArgs,
        ) -> Result<DriveFile, UpstreamError> {
            self.record("copy_file");
            Ok(DriveFile {
                id: Some(format!("{}-copy", request.file_id)),
                ..DriveFile::default()
            })
        }
    }

    fn dispatcher(
        api: Arc<FakeDocsApi>,
        auth: Arc<FakeAuth>,
        channel: Channel,
    ) -> Dispatcher {
        Dispatcher::new(api, Gatekeeper::new(auth, channel), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn create_doc_happy_path() {
        let api = Arc::new(FakeDocsApi::default());
        let auth = Arc::new(FakeAuth::new(true, None));
        let result = dispatcher(api.clone(), auth, Channel::Stdio)
            .dispatch("create-doc", &json!({ "title": "Q3 Plan" }))
            .await
            .unwrap();
        assert_eq!(result.text, "Q3 Plan (1AbC)");
        assert_eq!(api.calls(), vec!["create_document"]);
    }

    #[tokio::test]
    async fn empty_listing_renders_sentinel() {
        let api = Arc::new(FakeDocsApi::default());
        let auth = Arc::new(FakeAuth::new(true, None));
        let result = dispatcher(api, auth, Channel::Stdio)
            .dispatch("list-docs", &json!({}))
            .await
            .unwrap();
        assert_eq!(result.text, "No files found");
    }

    #[tokio::test]
    async fn validation_fails_before_authentication() {
        let api = Arc::new(FakeDocsApi::default());
        let auth = Arc::new(FakeAuth::new(true, None));
        let err = dispatcher(api.clone(), auth.clone(), Channel::Stdio)
            .dispatch("create-doc", &json!({ "title": "" }))
            .await
            .unwrap_err();
        let GatewayError::Validation { errors, .. } = err else {
            panic!("expected validation error");
        };
        assert!(errors.mentions("title"));
        assert_eq!(auth.validations.load(Ordering::SeqCst), 0);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn every_violation_is_reported() {
        let api = Arc::new(FakeDocsApi::default());
        let auth = Arc::new(FakeAuth::new(true, None));
        let err = dispatcher(api, auth, Channel::Stdio)
            .dispatch(
                "update-doc",
                &json!({
                    "documentId": "",
                    "requestBody": {
                        "requests": [{
                            "insertText": { "location": { "index": 1 }, "text": "x" },
                            "deleteContentRange": { "range": { "startIndex": 1, "endIndex": 2 } }
                        }]
                    }
                }),
            )
            .await
            .unwrap_err();
        let GatewayError::Validation { errors, .. } = err else {
            panic!("expected validation error");
        };
        assert!(errors.mentions("documentId"));
        assert!(errors.mentions("requestBody.requests[0]"));
    }

    #[tokio::test]
    async fn unknown_tool_touches_nothing() {
        let api = Arc::new(FakeDocsApi::default());
        let auth = Arc::new(FakeAuth::new(true, None));
        let err = dispatcher(api.clone(), auth.clone(), Channel::Stdio)
            .dispatch("delete-doc", &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::UnknownTool(name) if name == "delete-doc"));
        assert_eq!(auth.validations.load(Ordering::SeqCst), 0);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn failed_http_reauth_blocks_upstream_call() {
        let api = Arc::new(FakeDocsApi::default());
        let auth = Arc::new(FakeAuth::new(false, Some(false)));
        let err = dispatcher(api.clone(), auth.clone(), Channel::Http)
            .dispatch(
                "update-doc",
                &json!({
                    "documentId": "1AbC",
                    "requestBody": { "requests": [{ "insertText": { "location": { "index": 1 }, "text": "Hi" } }] }
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Authentication(_)));
        assert_eq!(auth.flows.load(Ordering::SeqCst), 1);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn stdio_invalid_credential_asks_for_restart() {
        let api = Arc::new(FakeDocsApi::default());
        let auth = Arc::new(FakeAuth::new(false, Some(true)));
        let err = dispatcher(api.clone(), auth, Channel::Stdio)
            .dispatch("list-docs", &json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("restart the server"));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn upstream_not_found_is_normalized() {
        let api = Arc::new(FakeDocsApi {
            get_error: Some(UpstreamError::status(404, json!({}))),
            ..FakeDocsApi::default()
        });
        let auth = Arc::new(FakeAuth::new(true, None));
        let err = dispatcher(api, auth, Channel::Stdio)
            .dispatch("get-doc", &json!({ "docsArgs": { "documentId": "gone" } }))
            .await
            .unwrap_err();
        let GatewayError::Tool(normalized) = err else {
            panic!("expected tool error");
        };
        assert_eq!(normalized.kind(), ErrorKind::NotFound);
        assert!(!normalized.retryable());
        assert_eq!(
            normalized.message(),
            "Resource not found: The requested document or file does not exist"
        );
    }

    #[tokio::test]
    async fn update_doc_reports_applied_requests() {
        let api = Arc::new(FakeDocsApi::default());
        let auth = Arc::new(FakeAuth::new(true, None));
        let result = dispatcher(api, auth, Channel::Http)
            .dispatch(
                "update-doc",
                &json!({
                    "documentId": "1AbC",
                    "requestBody": { "requests": [
                        { "insertText": { "location": { "index": 1 }, "text": "Hi" } },
                        { "replaceAllText": { "containsText": { "text": "a" }, "replaceText": "b" } }
                    ] }
                }),
            )
            .await
            .unwrap();
        assert_eq!(result.text, "1AbC: applied 2 request(s)  rev:unknown-revision");
    }

    #[test]
    fn listing_is_fixed() {
        let api = Arc::new(FakeDocsApi::default());
        let auth = Arc::new(FakeAuth::new(true, None));
        let dispatcher = dispatcher(api, auth, Channel::Stdio);
        let names: Vec<&str> = dispatcher
            .list_tool_descriptors()
            .iter()
            .map(|tool| tool.name)
            .collect();
        assert_eq!(names.len(), 6);
        assert_eq!(names[0], "list-docs");
    }
}
