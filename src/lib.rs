//! Todo Service — CRUD over a single todo resource, backed by libSQL.

pub mod config;
pub mod error;
pub mod logging;
pub mod request_id;
pub mod store;
pub mod todos;
