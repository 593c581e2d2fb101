//! # Models Module
//!
//! Wire-level records exchanged with the two services.
//!
//! - **Submissions** ([`submission`]) - Payloads POSTed to a `submit` endpoint. Optional
//!   fields that are absent are omitted from the wire form entirely.
//! - **Hits** ([`hit`]) - Resolved template hits and their template alignments returned by
//!   the template-selection service.

pub mod hit;
pub mod submission;

pub use hit::{ResolvedHit, TemplateAlignment};
pub use submission::{SubmitAlignment, SubmitSelectTemplate};
