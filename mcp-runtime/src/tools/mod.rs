//! The fixed tool table.
//!
//! Each [`ToolKind`] binds a name, a description and an input contract. The
//! table is built once per process and never changes.

pub mod args;
pub mod format;
pub mod handler;
pub mod schemas;

use std::sync::LazyLock;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::contract::{ObjectContract, ROOT_PATH, ValidationErrors};
use args::{CopyDocArgs, CreateDocArgs, GetDocArgs, ListDocsArgs, ListTabsArgs, UpdateDocArgs};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    ListDocs,
    GetDoc,
    CreateDoc,
    UpdateDoc,
    CopyDoc,
    ListTabs,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::ListDocs,
        ToolKind::GetDoc,
        ToolKind::CreateDoc,
        ToolKind::UpdateDoc,
        ToolKind::CopyDoc,
        ToolKind::ListTabs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::ListDocs => "list-docs",
            ToolKind::GetDoc => "get-doc",
            ToolKind::CreateDoc => "create-doc",
            ToolKind::UpdateDoc => "update-doc",
            ToolKind::CopyDoc => "copy-doc",
            ToolKind::ListTabs => "list-tabs",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    fn description(self) -> &'static str {
        match self {
            ToolKind::ListDocs => {
                "List Google Docs from Drive. Can filter by folder ID and additional Drive query parameters."
            }
            ToolKind::GetDoc => {
                "Retrieve a Google Doc's metadata and text, as a bounded preview or in full. Supports fetching tab content."
            }
            ToolKind::CreateDoc => "Create a new blank Google Doc with a given title.",
            ToolKind::UpdateDoc => {
                "Apply an ordered batch of edits (insert, replace, style, bullets, delete) to a Google Doc, optionally pinned to a required revision."
            }
            ToolKind::CopyDoc => {
                "Copy an existing Google Doc to a new file. Optionally rename it and place it in specific folders."
            }
            ToolKind::ListTabs => {
                "List the tabs of a Google Doc with their IDs and titles, optionally including child tabs."
            }
        }
    }

    fn contract(self) -> ObjectContract {
        match self {
            ToolKind::ListDocs => schemas::list_docs(),
            ToolKind::GetDoc => schemas::get_doc(),
            ToolKind::CreateDoc => schemas::create_doc(),
            ToolKind::UpdateDoc => schemas::update_doc(),
            ToolKind::CopyDoc => schemas::copy_doc(),
            ToolKind::ListTabs => schemas::list_tabs(),
        }
    }
}

#[derive(Debug)]
pub struct ToolDescriptor {
    pub kind: ToolKind,
    pub name: &'static str,
    pub description: &'static str,
    contract: ObjectContract,
    input_schema: Value,
}

impl ToolDescriptor {
    fn new(kind: ToolKind) -> Self {
        let contract = kind.contract();
        let input_schema = contract.to_json_schema();
        Self {
            kind,
            name: kind.name(),
            description: kind.description(),
            contract,
            input_schema,
        }
    }

    pub fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// `{name, description, inputSchema}` as advertised by `tools/list`.
    pub fn to_listing(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema,
        })
    }

    /// Run the contract and bind the result to this tool's argument type.
    pub fn validate(&self, raw: &Value) -> Result<ValidatedArgs, ValidationErrors> {
        let normalized = self.contract.validate(raw)?;
        Ok(match self.kind {
            ToolKind::ListDocs => ValidatedArgs::ListDocs(bind(normalized)?),
            ToolKind::GetDoc => ValidatedArgs::GetDoc(bind(normalized)?),
            ToolKind::CreateDoc => ValidatedArgs::CreateDoc(bind(normalized)?),
            ToolKind::UpdateDoc => ValidatedArgs::UpdateDoc(bind(normalized)?),
            ToolKind::CopyDoc => ValidatedArgs::CopyDoc(bind(normalized)?),
            ToolKind::ListTabs => ValidatedArgs::ListTabs(bind(normalized)?),
        })
    }
}

fn bind<T: DeserializeOwned>(normalized: Value) -> Result<T, ValidationErrors> {
    serde_json::from_value(normalized)
        .map_err(|err| ValidationErrors::single(ROOT_PATH, err.to_string()))
}

static REGISTRY: LazyLock<Vec<ToolDescriptor>> =
    LazyLock::new(|| ToolKind::ALL.into_iter().map(ToolDescriptor::new).collect());

/// All tools, in listing order.
pub fn registry() -> &'static [ToolDescriptor] {
    &REGISTRY
}

pub fn descriptor(name: &str) -> Option<&'static ToolDescriptor> {
    registry().iter().find(|tool| tool.name == name)
}

/// Arguments that passed a tool's contract. Only [`ToolDescriptor::validate`]
/// produces these, one variant per tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedArgs {
    ListDocs(ListDocsArgs),
    GetDoc(GetDocArgs),
    CreateDoc(CreateDocArgs),
    UpdateDoc(UpdateDocArgs),
    CopyDoc(CopyDocArgs),
    ListTabs(ListTabsArgs),
}

impl ValidatedArgs {
    pub fn kind(&self) -> ToolKind {
        match self {
            ValidatedArgs::ListDocs(_) => ToolKind::ListDocs,
            ValidatedArgs::GetDoc(_) => ToolKind::GetDoc,
            ValidatedArgs::CreateDoc(_) => ToolKind::CreateDoc,
            ValidatedArgs::UpdateDoc(_) => ToolKind::UpdateDoc,
            ValidatedArgs::CopyDoc(_) => ToolKind::CopyDoc,
            ValidatedArgs::ListTabs(_) => ToolKind::ListTabs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub text: String,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn to_value(&self) -> Value {
        json!({ "content": [{ "type": "text", "text": self.text }] })
    }
}
