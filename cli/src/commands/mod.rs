pub mod auth;
pub mod tools;
