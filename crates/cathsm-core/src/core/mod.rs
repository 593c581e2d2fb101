//! # Core Module
//!
//! Foundation types shared by the engine and the workflows: wire payloads, the authenticated
//! HTTP client, credential resolution, the persistent token store and file I/O helpers.
//!
//! Nothing in this module sleeps, polls or keeps job state; it either transforms values or
//! performs exactly one request/file operation per call.

pub mod credentials;
pub mod http;
pub mod io;
pub mod models;
pub mod store;
