//! Request handlers, one module per resource.

pub mod admin;
pub mod connection;
pub mod generation;
pub mod models;
pub mod project;
pub mod snippet;
pub mod version;
