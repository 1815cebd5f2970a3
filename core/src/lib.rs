//! Leaf utilities shared by the gdocs MCP runtime, server and CLI.

pub mod account;
pub mod auth;
pub mod error;
pub mod sanitize;

pub use account::AccountMode;
pub use error::ErrorKind;
