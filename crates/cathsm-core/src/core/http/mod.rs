//! # HTTP Module
//!
//! The authenticated, endpoint-templated client shared by every service this crate talks to.
//!
//! ## Overview
//!
//! A service is described by an [`EndpointSet`](endpoints::EndpointSet): logical action names
//! (`auth`, `submit`, `status`, `results`, ...) mapped to URL templates with `{named}`
//! placeholders. An [`ApiClient`](client::ApiClient) joins that set to a base URL, carries the
//! current `Authorization` header, and sends requests through a [`Transport`](transport::Transport).
//!
//! ## Architecture
//!
//! - **Endpoints** ([`endpoints`]) - Template registration, validation and substitution
//! - **Client** ([`client`]) - Request building, authentication and response hooks
//! - **Responses** ([`response`]) - Centralized status/JSON classification
//! - **Transport** ([`transport`]) - The wire seam, with a `reqwest` implementation
//! - **Errors** ([`error`]) - Client-level error taxonomy

pub mod client;
pub mod endpoints;
pub mod error;
pub mod response;
pub mod transport;

pub use client::{ApiClient, Fields, Method, fields_from};
pub use error::ClientError;
pub use response::ApiResponse;
pub use transport::{HttpTransport, RawResponse, Request, Transport};
