//! Text rendering of upstream responses.
//!
//! Every function here is total: missing metadata becomes a placeholder and
//! every upstream string is sanitized before it is written out.

use gdocs_core::sanitize::{
    DESCRIPTION_MAX_CHARS, collapse_whitespace, sanitize, sanitize_with_limit,
    truncate_with_ellipsis,
};

use crate::tools::args::FormattingArgs;
use crate::upstream::{BatchUpdateResponse, Body, Document, DriveFile, FileList, Tab};

pub const NO_FILES: &str = "No files found";
pub const NO_DOCUMENTS: &str = "No documents found";
pub const NO_TABS: &str = "No tabs found";
pub const PREVIEW_FLOOR: usize = 200;

const UNTITLED: &str = "Untitled";
const NO_ID: &str = "no-id";
const UNKNOWN_ID: &str = "unknown-id";
const UNKNOWN: &str = "Unknown";
const UNKNOWN_REVISION: &str = "unknown-revision";

fn field_or(value: Option<&str>, placeholder: &str) -> String {
    let clean = value.map(sanitize).unwrap_or_default();
    if clean.is_empty() {
        placeholder.to_string()
    } else {
        clean
    }
}

pub fn format_created(document: &Document) -> String {
    format!(
        "{} ({})",
        field_or(document.title.as_deref(), UNTITLED),
        field_or(document.document_id.as_deref(), UNKNOWN_ID)
    )
}

pub fn format_file_list(list: &FileList) -> String {
    let blocks: Vec<String> = list.files.iter().map(format_file_entry).collect();
    let mut out = if blocks.is_empty() {
        NO_FILES.to_string()
    } else {
        blocks.join("\n\n")
    };
    let next = list.next_page_token.as_deref().map(sanitize).unwrap_or_default();
    if !next.is_empty() {
        out.push_str("\n\nNext page token: ");
        out.push_str(&next);
    }
    out
}

fn format_file_entry(file: &DriveFile) -> String {
    let mut block = format!(
        "{} ({})\n  Kind: {}  Created: {}  Modified: {}",
        field_or(file.name.as_deref(), UNTITLED),
        field_or(file.id.as_deref(), NO_ID),
        field_or(file.kind.as_deref(), UNKNOWN),
        field_or(file.created_time.as_deref(), UNKNOWN),
        field_or(file.modified_time.as_deref(), UNKNOWN),
    );
    if let Some(description) = file.description.as_deref() {
        let description = truncate_with_ellipsis(description, DESCRIPTION_MAX_CHARS);
        if !description.is_empty() {
            block.push_str("\n  Description: ");
            block.push_str(&description);
        }
    }
    block
}

/// Summary line plus either a bounded preview or the full text.
pub fn format_document(document: &Document, options: &FormattingArgs) -> String {
    let stats = DocumentStats::collect(document);
    let mut out = format!(
        "{} ({})  rev:{}  Paragraphs:{}  Tables:{}  Images:{}  Headers:{}  Footers:{}",
        field_or(document.title.as_deref(), UNTITLED),
        field_or(document.document_id.as_deref(), UNKNOWN_ID),
        field_or(document.revision_id.as_deref(), UNKNOWN_REVISION),
        stats.paragraphs,
        stats.tables,
        stats.images,
        yes_no(stats.headers),
        yes_no(stats.footers),
    );

    if options.include_preview.unwrap_or(false) {
        let budget = options
            .preview_chars
            .unwrap_or(PREVIEW_FLOOR)
            .max(PREVIEW_FLOOR);
        let preview = document_text(document, budget);
        if !preview.is_empty() {
            out.push_str("\n  Preview: ");
            out.push_str(&preview);
        }
    } else {
        let full = document_text(document, usize::MAX);
        if !full.is_empty() {
            out.push_str("\n  Full Text: ");
            out.push_str(&full);
        }
    }
    out
}

pub fn format_batch_update(document_id: &str, response: Option<&BatchUpdateResponse>) -> String {
    let Some(response) = response else {
        return NO_DOCUMENTS.to_string();
    };
    let id = field_or(
        response.document_id.as_deref().or(Some(document_id)),
        UNKNOWN_ID,
    );
    let revision = field_or(
        response
            .write_control
            .as_ref()
            .and_then(|control| control.required_revision_id.as_deref()),
        UNKNOWN_REVISION,
    );
    format!(
        "{id}: applied {} request(s)  rev:{revision}",
        response.replies.len()
    )
}

pub fn format_copied(file: &DriveFile) -> String {
    format!(
        "{} ({})",
        field_or(file.name.as_deref(), UNTITLED),
        field_or(file.id.as_deref(), NO_ID)
    )
}

pub fn format_tabs(document: &Document, include_children: bool) -> String {
    let mut lines = Vec::new();
    push_tab_lines(&document.tabs, 0, include_children, &mut lines);
    if lines.is_empty() {
        NO_TABS.to_string()
    } else {
        lines.join("\n")
    }
}

fn push_tab_lines(tabs: &[Tab], depth: usize, include_children: bool, lines: &mut Vec<String>) {
    for tab in tabs {
        let properties = tab.tab_properties.as_ref();
        lines.push(format!(
            "{}- {} ({})",
            "  ".repeat(depth),
            field_or(properties.and_then(|p| p.title.as_deref()), UNTITLED),
            field_or(properties.and_then(|p| p.tab_id.as_deref()), NO_ID),
        ));
        if include_children {
            push_tab_lines(&tab.child_tabs, depth + 1, include_children, lines);
        }
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct DocumentStats {
    paragraphs: usize,
    tables: usize,
    images: usize,
    headers: bool,
    footers: bool,
}

impl DocumentStats {
    /// Counts cover the top-level body and every tab, nested tabs included.
    fn collect(document: &Document) -> Self {
        let mut stats = DocumentStats {
            images: document.inline_objects.len(),
            headers: !document.headers.is_empty(),
            footers: !document.footers.is_empty(),
            ..Self::default()
        };
        for body in document_bodies(document) {
            for element in &body.content {
                if element.paragraph.is_some() {
                    stats.paragraphs += 1;
                }
                if element.table.is_some() {
                    stats.tables += 1;
                }
            }
        }
        visit_tabs(&document.tabs, &mut |tab| {
            if let Some(content) = &tab.document_tab {
                stats.images += content.inline_objects.len();
                stats.headers |= !content.headers.is_empty();
                stats.footers |= !content.footers.is_empty();
            }
        });
        stats
    }
}

fn visit_tabs<'a>(tabs: &'a [Tab], visit: &mut dyn FnMut(&'a Tab)) {
    for tab in tabs {
        visit(tab);
        visit_tabs(&tab.child_tabs, visit);
    }
}

fn document_bodies(document: &Document) -> Vec<&Body> {
    let mut bodies: Vec<&Body> = document.body.iter().collect();
    visit_tabs(&document.tabs, &mut |tab| {
        if let Some(body) = tab.document_tab.as_ref().and_then(|t| t.body.as_ref()) {
            bodies.push(body);
        }
    });
    bodies
}

/// Whitespace-collapsed, sanitized text of the document, at most `budget` chars.
fn document_text(document: &Document, budget: usize) -> String {
    let mut raw = String::new();
    'bodies: for body in document_bodies(document) {
        for element in &body.content {
            let Some(paragraph) = &element.paragraph else {
                continue;
            };
            for piece in &paragraph.elements {
                if let Some(content) = piece.text_run.as_ref().and_then(|r| r.content.as_deref()) {
                    raw.push_str(content);
                }
                // Upper bound only; collapsing can shrink the text further.
                if budget != usize::MAX && raw.len() >= budget.saturating_mul(4) {
                    break 'bodies;
                }
            }
        }
    }
    sanitize_with_limit(&collapse_whitespace(&raw), budget)
}
