//! One-shot execution of a validated tool call against the upstream API.

use std::future::Future;
use std::time::Duration;

use crate::auth::Credential;
use crate::normalize::{NormalizedError, classify};
use crate::tools::args::{
    CopyDocArgs, CreateDocArgs, GetDocArgs, ListDocsArgs, ListTabsArgs, UpdateDocArgs,
};
use crate::tools::format;
use crate::tools::{ToolResult, ValidatedArgs};
use crate::upstream::{DocsApi, DocumentQuery, FileListQuery, UpstreamError};

const DOCUMENT_MIME_QUERY: &str = "mimeType='application/vnd.google-apps.document'";
const FILE_LIST_FIELDS: &str =
    "nextPageToken, files(id, name, kind, mimeType, createdTime, modifiedTime, description)";
const TAB_FIELDS: &str = "tabs(tabProperties,childTabs)";
const DEFAULT_PAGE_SIZE: u32 = 50;

/// Built per call with the credential the gatekeeper just confirmed.
pub struct ToolHandler<'a> {
    api: &'a dyn DocsApi,
    credential: Credential,
    timeout: Duration,
}

impl<'a> ToolHandler<'a> {
    pub fn new(api: &'a dyn DocsApi, credential: Credential, timeout: Duration) -> Self {
        Self {
            api,
            credential,
            timeout,
        }
    }

    pub async fn run(self, args: ValidatedArgs) -> Result<ToolResult, NormalizedError> {
        let text = match args {
            ValidatedArgs::ListDocs(args) => self.list_docs(args).await,
            ValidatedArgs::GetDoc(args) => self.get_doc(args).await,
            ValidatedArgs::CreateDoc(args) => self.create_doc(args).await,
            ValidatedArgs::UpdateDoc(args) => self.update_doc(args).await,
            ValidatedArgs::CopyDoc(args) => self.copy_doc(args).await,
            ValidatedArgs::ListTabs(args) => self.list_tabs(args).await,
        }
        .map_err(|err| classify(&err))?;
        Ok(ToolResult::text(text))
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, UpstreamError>>,
    ) -> Result<T, UpstreamError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| UpstreamError::Timeout(self.timeout))?
    }

    async fn list_docs(&self, args: ListDocsArgs) -> Result<String, UpstreamError> {
        let query = FileListQuery {
            q: drive_query(args.folder_id.as_deref(), args.query.as_deref()),
            fields: FILE_LIST_FIELDS.to_string(),
            order_by: args.order_by,
            page_size: args.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            page_token: args.page_token,
            spaces: args.spaces,
            all_drives: args.include_all_drives,
        };
        let list = self
            .bounded(self.api.list_files(&self.credential, &query))
            .await?;
        Ok(format::format_file_list(&list))
    }

    async fn get_doc(&self, args: GetDocArgs) -> Result<String, UpstreamError> {
        let query = DocumentQuery {
            document_id: args.docs_args.document_id,
            include_tabs_content: args.docs_args.include_tabs_content,
            fields: args.docs_args.fields,
        };
        let document = self
            .bounded(self.api.get_document(&self.credential, &query))
            .await?;
        Ok(format::format_document(
            &document,
            &args.formatting_args.unwrap_or_default(),
        ))
    }

    async fn create_doc(&self, args: CreateDocArgs) -> Result<String, UpstreamError> {
        let document = self
            .bounded(self.api.create_document(&self.credential, &args.title))
            .await?;
        Ok(format::format_created(&document))
    }

    async fn update_doc(&self, args: UpdateDocArgs) -> Result<String, UpstreamError> {
        let response = self
            .bounded(
                self.api
                    .batch_update(&self.credential, &args.document_id, &args.request_body),
            )
            .await?;
        Ok(format::format_batch_update(
            &args.document_id,
            response.as_ref(),
        ))
    }

    async fn copy_doc(&self, args: CopyDocArgs) -> Result<String, UpstreamError> {
        let file = self
            .bounded(self.api.copy_file(&self.credential, &args))
            .await?;
        Ok(format::format_copied(&file))
    }

    async fn list_tabs(&self, args: ListTabsArgs) -> Result<String, UpstreamError> {
        let query = DocumentQuery {
            document_id: args.document_id,
            include_tabs_content: Some(true),
            fields: Some(TAB_FIELDS.to_string()),
        };
        let document = self
            .bounded(self.api.get_document(&self.credential, &query))
            .await?;
        Ok(format::format_tabs(
            &document,
            args.include_child_tabs.unwrap_or(false),
        ))
    }
}

/// Drive search expression: documents only, optionally inside one folder,
/// ANDed with the caller's own query.
fn drive_query(folder_id: Option<&str>, extra: Option<&str>) -> String {
    let mut clauses = vec![DOCUMENT_MIME_QUERY.to_string()];
    if let Some(folder) = folder_id.filter(|f| !f.trim().is_empty()) {
        clauses.push(format!("'{}' in parents", escape_literal(folder)));
    }
    if let Some(extra) = extra.filter(|q| !q.trim().is_empty()) {
        clauses.push(format!("({extra})"));
    }
    clauses.join(" and ")
}

fn escape_literal(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::tools::args::BatchUpdateRequest;
    use crate::tools::descriptor;
    use crate::upstream::{
        BatchUpdateResponse, Body, Document, DriveFile, FileList, Paragraph, ParagraphElement,
        StructuralElement, TextRun,
    };
    use gdocs_core::ErrorKind;

    #[derive(Default)]
    struct Recorder {
        list_queries: Mutex<Vec<FileListQuery>>,
        doc_queries: Mutex<Vec<DocumentQuery>>,
        batch_bodies: Mutex<Vec<serde_json::Value>>,
        delay: Option<Duration>,
        fail_with: Option<UpstreamError>,
    }

    impl Recorder {
        fn check(&self) -> Result<(), UpstreamError> {
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl DocsApi for Recorder {
        async fn create_document(
            &self,
            _credential: &Credential,
            title: &str,
        ) -> Result<Document, UpstreamError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.check()?;
            Ok(Document {
                document_id: Some("doc-1".to_string()),
                title: Some(title.to_string()),
                ..Document::default()
            })
        }

        async fn get_document(
            &self,
            _credential: &Credential,
            query: &DocumentQuery,
        ) -> Result<Document, UpstreamError> {
            self.doc_queries.lock().unwrap().push(query.clone());
            self.check()?;
            Ok(Document {
                document_id: Some(query.document_id.clone()),
                title: Some("Notes".to_string()),
                revision_id: Some("r9".to_string()),
                body: Some(Body {
                    content: vec![StructuralElement {
                        paragraph: Some(Paragraph {
                            elements: vec![ParagraphElement {
                                text_run: Some(TextRun {
                                    content: Some("Hello   world\n".to_string()),
                                }),
                            }],
                        }),
                        table: None,
                    }],
                }),
                ..Document::default()
            })
        }

        async fn list_files(
            &self,
            _credential: &Credential,
            query: &FileListQuery,
        ) -> Result<FileList, UpstreamError> {
            self.list_queries.lock().unwrap().push(query.clone());
            self.check()?;
            Ok(FileList::default())
        }

        async fn batch_update(
            &self,
            _credential: &Credential,
            _document_id: &str,
            request: &BatchUpdateRequest,
        ) -> Result<Option<BatchUpdateResponse>, UpstreamError> {
            self.batch_bodies
                .lock()
                .unwrap()
                .push(serde_json::to_value(request).unwrap());
            self.check()?;
            Ok(None)
        }

        async fn copy_file(
            &self,
            _credential: &Credential,
            request: &CopyDocArgs,
        ) -> Result<DriveFile, UpstreamError> {
            self.check()?;
            Ok(DriveFile {
                id: Some("copy-1".to_string()),
                name: request.request_body.as_ref().and_then(|b| b.name.clone()),
                ..DriveFile::default()
            })
        }
    }

    fn validated(tool: &str, raw: serde_json::Value) -> ValidatedArgs {
        descriptor(tool).unwrap().validate(&raw).unwrap()
    }

    async fn run(api: &Recorder, tool: &str, raw: serde_json::Value) -> Result<ToolResult, NormalizedError> {
        ToolHandler::new(api, Credential::new("token", None), Duration::from_secs(5))
            .run(validated(tool, raw))
            .await
    }

    #[test]
    fn drive_query_combines_clauses() {
        assert_eq!(drive_query(None, None), DOCUMENT_MIME_QUERY);
        assert_eq!(
            drive_query(Some("fo'ld"), Some("name contains 'plan'")),
            format!("{DOCUMENT_MIME_QUERY} and 'fo\\'ld' in parents and (name contains 'plan')")
        );
        assert_eq!(drive_query(Some("  "), Some("")), DOCUMENT_MIME_QUERY);
    }

    #[tokio::test]
    async fn list_docs_uses_defaults() {
        let api = Recorder::default();
        let result = run(&api, "list-docs", json!({})).await.unwrap();
        assert_eq!(result.text, "No files found");

        let queries = api.list_queries.lock().unwrap();
        assert_eq!(queries[0].page_size, 50);
        assert!(queries[0].all_drives);
        assert_eq!(queries[0].fields, FILE_LIST_FIELDS);
    }

    #[tokio::test]
    async fn create_doc_renders_title_and_id() {
        let api = Recorder::default();
        let result = run(&api, "create-doc", json!({ "title": "Q3 Plan" })).await.unwrap();
        assert_eq!(result.text, "Q3 Plan (doc-1)");
    }

    #[tokio::test]
    async fn get_doc_defaults_to_full_text() {
        let api = Recorder::default();
        let result = run(&api, "get-doc", json!({ "docsArgs": { "documentId": "d1" } }))
            .await
            .unwrap();
        assert!(result.text.starts_with("Notes (d1)  rev:r9  Paragraphs:1"));
        assert!(result.text.ends_with("Full Text: Hello world"));
    }

    #[tokio::test]
    async fn list_tabs_requests_tab_fields_only() {
        let api = Recorder::default();
        let result = run(&api, "list-tabs", json!({ "documentId": "d2" })).await.unwrap();
        assert_eq!(result.text, "No tabs found");
        let queries = api.doc_queries.lock().unwrap();
        assert_eq!(queries[0].include_tabs_content, Some(true));
        assert_eq!(queries[0].fields.as_deref(), Some(TAB_FIELDS));
    }

    #[tokio::test]
    async fn update_doc_forwards_body_and_handles_empty_reply() {
        let api = Recorder::default();
        let result = run(
            &api,
            "update-doc",
            json!({
                "documentId": "d3",
                "requestBody": { "requests": [{ "insertText": { "location": { "index": 1 }, "text": "Hi" } }] }
            }),
        )
        .await
        .unwrap();
        assert_eq!(result.text, "No documents found");
        assert_eq!(
            api.batch_bodies.lock().unwrap()[0],
            json!({ "requests": [{ "insertText": { "location": { "index": 1 }, "text": "Hi" } }] })
        );
    }

    #[tokio::test]
    async fn copy_doc_renders_new_file() {
        let api = Recorder::default();
        let result = run(
            &api,
            "copy-doc",
            json!({ "fileId": "src", "requestBody": { "name": "Copy of Plan" } }),
        )
        .await
        .unwrap();
        assert_eq!(result.text, "Copy of Plan (copy-1)");
    }

    #[tokio::test]
    async fn upstream_failures_are_classified() {
        let api = Recorder {
            fail_with: Some(UpstreamError::status(
                404,
                json!({ "error": { "message": "Requested entity was not found." } }),
            )),
            ..Recorder::default()
        };
        let err = run(&api, "get-doc", json!({ "docsArgs": { "documentId": "missing" } }))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), "Resource not found: Requested entity was not found.");
    }

    #[tokio::test]
    async fn slow_upstream_times_out_as_internal() {
        let api = Recorder {
            delay: Some(Duration::from_secs(60)),
            ..Recorder::default()
        };
        let err = ToolHandler::new(&api, Credential::new("token", None), Duration::from_millis(250))
            .run(validated("create-doc", json!({ "title": "Slow" })))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.message(), "Internal error: Operation timed out after 250ms");
    }
}
