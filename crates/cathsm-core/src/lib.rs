//! # CATH-SM Core Library
//!
//! A client library for the CATH template-selection and SWISS-MODEL homology-modelling web
//! services. Both services follow the same asynchronous *submit / status / results* protocol,
//! which this crate drives from a protein sequence all the way to 3D model coordinates.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture:
//!
//! - **[`core`]: The Foundation.** Stateless building blocks: submission payloads and service
//!   records (`models`), the endpoint-templated authenticated HTTP client (`http`), credential
//!   resolution (`credentials`), the sectioned token store (`store`), FASTA and TSV I/O (`io`).
//!
//! - **[`engine`]: The Protocol Core.** The submit/status/results state machine with its
//!   polling policy, progress reporting and the aggregated error taxonomy.
//!
//! - **[`workflows`]: The Public API.** Stage managers that wire credentials, client and
//!   state machine together for one service, the two concrete stages, and the batch pipeline
//!   driver chaining them per input sequence.

pub mod core;
pub mod engine;
pub mod workflows;
