//! Typed tool arguments.
//!
//! These are deserialized from the output of a tool's contract, never from raw
//! caller input, so defaults are already applied and unknown fields are gone.
//! Batch-update and copy payloads double as the upstream request bodies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::upstream::WriteControl;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocsArgs {
    pub folder_id: Option<String>,
    pub query: Option<String>,
    pub order_by: Option<String>,
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
    pub spaces: Option<String>,
    #[serde(default = "default_true")]
    pub include_all_drives: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetDocArgs {
    pub docs_args: DocsArgs,
    pub formatting_args: Option<FormattingArgs>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocsArgs {
    pub document_id: String,
    pub include_tabs_content: Option<bool>,
    pub fields: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattingArgs {
    pub include_preview: Option<bool>,
    pub preview_chars: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateDocArgs {
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocArgs {
    pub document_id: String,
    pub request_body: BatchUpdateRequest,
}

/// Body of `documents.batchUpdate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_control: Option<WriteControl>,
    pub requests: Vec<DocsRequest>,
}

/// One edit operation. Externally tagged, matching the Docs wire format
/// (`{"insertText": {...}}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocsRequest {
    InsertText(InsertText),
    ReplaceAllText(ReplaceAllText),
    UpdateParagraphStyle(UpdateParagraphStyle),
    UpdateTextStyle(UpdateTextStyle),
    CreateParagraphBullets(CreateParagraphBullets),
    DeleteParagraphBullets(RangeOnly),
    DeleteContentRange(RangeOnly),
}

impl DocsRequest {
    pub fn operation(&self) -> &'static str {
        match self {
            DocsRequest::InsertText(_) => "insertText",
            DocsRequest::ReplaceAllText(_) => "replaceAllText",
            DocsRequest::UpdateParagraphStyle(_) => "updateParagraphStyle",
            DocsRequest::UpdateTextStyle(_) => "updateTextStyle",
            DocsRequest::CreateParagraphBullets(_) => "createParagraphBullets",
            DocsRequest::DeleteParagraphBullets(_) => "deleteParagraphBullets",
            DocsRequest::DeleteContentRange(_) => "deleteContentRange",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub index: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertText {
    pub location: Location,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceAllText {
    pub contains_text: SubstringMatch,
    pub replace_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstringMatch {
    pub text: String,
    pub match_case: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    pub start_index: i64,
    pub end_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_id: Option<String>,
}

/// Style payloads stay as validated JSON; the field mask decides what applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParagraphStyle {
    pub range: Range,
    pub paragraph_style: Value,
    pub fields: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTextStyle {
    pub range: Range,
    pub text_style: Value,
    pub fields: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateParagraphBullets {
    pub range: Range,
    pub bullet_preset: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeOnly {
    pub range: Range,
}

/// Drive `files.copy` parameters plus the new file's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyDocArgs {
    pub file_id: String,
    pub ignore_default_visibility: Option<bool>,
    pub include_labels: Option<String>,
    pub include_permissions_for_view: Option<String>,
    pub keep_revision_forever: Option<bool>,
    pub ocr_language: Option<String>,
    #[serde(default = "default_true")]
    pub supports_all_drives: bool,
    pub request_body: Option<CopyMetadata>,
}

impl CopyDocArgs {
    /// Query-string pairs for `files.copy`, stable order.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("supportsAllDrives", self.supports_all_drives.to_string())];
        if let Some(flag) = self.ignore_default_visibility {
            pairs.push(("ignoreDefaultVisibility", flag.to_string()));
        }
        if let Some(labels) = &self.include_labels {
            pairs.push(("includeLabels", labels.clone()));
        }
        if let Some(view) = &self.include_permissions_for_view {
            pairs.push(("includePermissionsForView", view.clone()));
        }
        if let Some(flag) = self.keep_revision_forever {
            pairs.push(("keepRevisionForever", flag.to_string()));
        }
        if let Some(language) = &self.ocr_language {
            pairs.push(("ocrLanguage", language.clone()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_properties: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_requires_writer_permission: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewers_can_copy_content: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writers_can_share: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTabsArgs {
    pub document_id: String,
    pub include_child_tabs: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn docs_requests_serialize_in_wire_shape() {
        let body = BatchUpdateRequest {
            write_control: Some(WriteControl {
                required_revision_id: Some("rev-7".to_string()),
                target_revision_id: None,
            }),
            requests: vec![
                DocsRequest::InsertText(InsertText {
                    location: Location { index: 1 },
                    text: "Hello".to_string(),
                }),
                DocsRequest::DeleteContentRange(RangeOnly {
                    range: Range {
                        start_index: 1,
                        end_index: 4,
                        segment_id: None,
                    },
                }),
            ],
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({
                "writeControl": { "requiredRevisionId": "rev-7" },
                "requests": [
                    { "insertText": { "location": { "index": 1 }, "text": "Hello" } },
                    { "deleteContentRange": { "range": { "startIndex": 1, "endIndex": 4 } } }
                ]
            })
        );
    }

    #[test]
    fn copy_query_pairs_only_include_set_flags() {
        let args: CopyDocArgs = serde_json::from_value(json!({
            "fileId": "src",
            "ocrLanguage": "pt-BR",
            "supportsAllDrives": true
        }))
        .unwrap();
        assert_eq!(
            args.query_pairs(),
            vec![
                ("supportsAllDrives", "true".to_string()),
                ("ocrLanguage", "pt-BR".to_string())
            ]
        );
    }
}
