//! Request middleware: principal extraction for the access boundary.

pub mod auth;
