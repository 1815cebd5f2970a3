//! Input contracts, one per tool.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use crate::contract::{Field, ObjectContract, Shape};

static OCR_LANGUAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]{2}(-[A-Za-z]+)?$").expect("OCR language pattern is a valid regex")
});

pub const DOCS_OPERATIONS: [&str; 7] = [
    "insertText",
    "replaceAllText",
    "updateParagraphStyle",
    "updateTextStyle",
    "createParagraphBullets",
    "deleteParagraphBullets",
    "deleteContentRange",
];

const NAMED_STYLE_TYPES: &[&str] = &[
    "NORMAL_TEXT",
    "TITLE",
    "SUBTITLE",
    "HEADING_1",
    "HEADING_2",
    "HEADING_3",
    "HEADING_4",
    "HEADING_5",
    "HEADING_6",
];

const ALIGNMENTS: &[&str] = &["START", "CENTER", "END", "JUSTIFIED"];

const BULLET_PRESETS: &[&str] = &[
    "BULLET_DISC_CIRCLE_SQUARE",
    "BULLET_DIAMOND_CIRCLE_SQUARE",
    "BULLET_CHECKBOX",
    "NUMBERED_DECIMAL_ALPHA_ROMAN",
    "NUMBERED_DECIMAL_ALPHA_ROMAN_PARENS",
    "NUMBERED_DECIMAL_NESTED",
];

pub fn list_docs() -> ObjectContract {
    ObjectContract::new(vec![
        Field::optional("folderId", Shape::string())
            .describe("Optional Drive folder ID; restricts results to files whose parents contain it."),
        Field::optional("query", Shape::string()).describe(
            "Additional Drive 'q' expression ANDed with the Docs mimeType and optional parent. Example: \"name contains 'Spec'\".",
        ),
        Field::optional("orderBy", Shape::string())
            .describe("Drive orderBy string, e.g. 'modifiedTime desc,name'."),
        Field::optional("pageSize", Shape::integer(Some(1), Some(1000)))
            .describe("Max items per page (max 1000)."),
        Field::optional("pageToken", Shape::string())
            .describe("Drive page token from a previous list."),
        Field::optional("spaces", Shape::string())
            .describe("Drive spaces to search, e.g. 'drive'."),
        Field::optional("includeAllDrives", Shape::Boolean)
            .with_default(json!(true))
            .describe("Search shared drives as well as My Drive."),
    ])
}

pub fn get_doc() -> ObjectContract {
    let docs_args = ObjectContract::new(vec![
        Field::required("documentId", Shape::non_empty_string())
            .describe("ID of the Google Doc to retrieve."),
        Field::optional("includeTabsContent", Shape::Boolean).describe(
            "If true, returns document.tabs with full tab content; top-level body is left empty.",
        ),
        Field::optional("fields", Shape::string()).describe(
            "Optional partial-response selector, e.g. 'title,tabs.tabProperties,tabs.documentTab.body'.",
        ),
    ]);
    let formatting_args = ObjectContract::new(vec![
        Field::optional("includePreview", Shape::Boolean)
            .describe("If true, returns a preview of the document; otherwise the full text."),
        Field::optional("previewChars", Shape::integer(Some(200), None))
            .describe("Max preview characters (at least 200)."),
    ]);
    ObjectContract::new(vec![
        Field::required("docsArgs", Shape::Object(docs_args)),
        Field::optional("formattingArgs", Shape::Object(formatting_args)),
    ])
}

pub fn create_doc() -> ObjectContract {
    ObjectContract::new(vec![
        Field::required("title", Shape::non_empty_string()).describe("Title for the new document."),
    ])
}

fn range() -> Shape {
    Shape::Object(
        ObjectContract::new(vec![
            Field::required("startIndex", Shape::integer(Some(1), None)),
            Field::required("endIndex", Shape::integer(Some(1), None)),
            Field::optional("segmentId", Shape::string()),
        ])
        .ordered("startIndex", "endIndex")
        .describe("Half-open range [startIndex, endIndex)."),
    )
}

fn dimension() -> Shape {
    Shape::Object(ObjectContract::new(vec![
        Field::required("magnitude", Shape::Number).describe("Points."),
        Field::optional("unit", Shape::Const("PT")).with_default(json!("PT")),
    ]))
}

fn paragraph_style() -> Shape {
    Shape::Object(ObjectContract::new(vec![
        Field::optional("namedStyleType", Shape::Enum(NAMED_STYLE_TYPES)),
        Field::optional("alignment", Shape::Enum(ALIGNMENTS)),
        Field::optional("lineSpacing", Shape::Number),
        Field::optional("spaceAbove", dimension()),
        Field::optional("spaceBelow", dimension()),
    ]))
}

fn text_style() -> Shape {
    Shape::Object(ObjectContract::new(vec![
        Field::optional("bold", Shape::Boolean),
        Field::optional("italic", Shape::Boolean),
        Field::optional("underline", Shape::Boolean),
        Field::optional("strikethrough", Shape::Boolean),
        Field::optional("fontSize", dimension()),
        Field::optional(
            "weightedFontFamily",
            Shape::Object(ObjectContract::new(vec![
                Field::required("fontFamily", Shape::string()),
                Field::optional("weight", Shape::Number),
            ])),
        ),
    ]))
}

fn docs_request() -> Shape {
    let insert_text = ObjectContract::new(vec![
        Field::required(
            "location",
            Shape::Object(ObjectContract::new(vec![
                Field::required("index", Shape::integer(Some(1), None))
                    .describe("Docs insertion index (1 = after start marker)."),
            ])),
        ),
        Field::required("text", Shape::non_empty_string()),
    ]);
    let replace_all_text = ObjectContract::new(vec![
        Field::required(
            "containsText",
            Shape::Object(ObjectContract::new(vec![
                Field::required("text", Shape::non_empty_string())
                    .describe("Find pattern (literal, not regex)."),
                Field::optional("matchCase", Shape::Boolean).with_default(json!(false)),
            ])),
        ),
        Field::optional("replaceText", Shape::string()).with_default(json!("")),
    ]);
    let update_paragraph_style = ObjectContract::new(vec![
        Field::required("range", range()),
        Field::required("paragraphStyle", paragraph_style()),
        Field::required("fields", Shape::non_empty_string())
            .describe("Comma-separated mask of fields to update, e.g. 'namedStyleType,alignment'."),
    ]);
    let update_text_style = ObjectContract::new(vec![
        Field::required("range", range()),
        Field::required("textStyle", text_style()),
        Field::required("fields", Shape::non_empty_string())
            .describe("Comma-separated mask, e.g. 'bold,italic,fontSize'."),
    ]);
    let create_bullets = ObjectContract::new(vec![
        Field::required("range", range()),
        Field::required("bulletPreset", Shape::Enum(BULLET_PRESETS)),
    ]);
    let range_only = || ObjectContract::new(vec![Field::required("range", range())]);

    Shape::Object(
        ObjectContract::new(vec![
            Field::optional("insertText", Shape::Object(insert_text))
                .describe("Insert text into the body."),
            Field::optional("replaceAllText", Shape::Object(replace_all_text))
                .describe("Replace all occurrences of matching text."),
            Field::optional("updateParagraphStyle", Shape::Object(update_paragraph_style))
                .describe("Update paragraph-level styles in a range."),
            Field::optional("updateTextStyle", Shape::Object(update_text_style))
                .describe("Update character-level text styles in a range."),
            Field::optional("createParagraphBullets", Shape::Object(create_bullets))
                .describe("Create bullets or numbering for paragraphs in a range."),
            Field::optional("deleteParagraphBullets", Shape::Object(range_only()))
                .describe("Remove bullets or numbering from paragraphs in a range."),
            Field::optional("deleteContentRange", Shape::Object(range_only()))
                .describe("Delete content in the specified range."),
        ])
        .exactly_one_of(&DOCS_OPERATIONS),
    )
}

pub fn update_doc() -> ObjectContract {
    let write_control = ObjectContract::new(vec![
        Field::required("requiredRevisionId", Shape::string())
            .describe("The write fails unless the document is at this revision."),
    ]);
    let request_body = ObjectContract::new(vec![
        Field::optional("writeControl", Shape::Object(write_control))
            .describe("Optional optimistic concurrency control."),
        Field::required("requests", Shape::array(docs_request(), 1))
            .describe("One or more Docs requests; each must specify exactly one operation."),
    ]);
    ObjectContract::new(vec![
        Field::required("documentId", Shape::non_empty_string())
            .describe("The Google Docs documentId to update."),
        Field::required("requestBody", Shape::Object(request_body)),
    ])
}

pub fn copy_doc() -> ObjectContract {
    let metadata = ObjectContract::new(vec![
        Field::optional("name", Shape::non_empty_string()).describe("New file name for the copy."),
        Field::optional("parents", Shape::array(Shape::string(), 1))
            .describe("Destination folder IDs."),
        Field::optional("description", Shape::string()),
        Field::optional("mimeType", Shape::string()),
        Field::optional("properties", Shape::StringMap),
        Field::optional("appProperties", Shape::StringMap),
        Field::optional("copyRequiresWriterPermission", Shape::Boolean),
        Field::optional("viewersCanCopyContent", Shape::Boolean),
        Field::optional("writersCanShare", Shape::Boolean),
    ]);
    ObjectContract::new(vec![
        Field::required("fileId", Shape::non_empty_string())
            .describe("The ID of the source file to copy."),
        Field::optional("ignoreDefaultVisibility", Shape::Boolean)
            .describe("Bypass domain default visibility for the created file."),
        Field::optional("includeLabels", Shape::string())
            .describe("Comma-separated label IDs to include in labelInfo."),
        Field::optional("includePermissionsForView", Shape::Enum(&["published"]))
            .describe("Additional view's permissions to include."),
        Field::optional("keepRevisionForever", Shape::Boolean)
            .describe("Pin the new head revision forever."),
        Field::optional("ocrLanguage", Shape::pattern(&OCR_LANGUAGE))
            .describe("ISO 639-1 language hint for OCR, e.g. 'en' or 'pt-BR'."),
        Field::optional("supportsAllDrives", Shape::Boolean)
            .with_default(json!(true))
            .describe("Set true if using My Drive and/or shared drives."),
        Field::optional("requestBody", Shape::Object(metadata))
            .describe("File metadata for the created copy."),
    ])
}

pub fn list_tabs() -> ObjectContract {
    ObjectContract::new(vec![
        Field::required("documentId", Shape::non_empty_string()).describe("ID of the Google Doc."),
        Field::optional("includeChildTabs", Shape::Boolean)
            .describe("If true, include nested child tabs."),
    ])
}
