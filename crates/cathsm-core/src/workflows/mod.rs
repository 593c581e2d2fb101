//! # Workflows Module
//!
//! The public entry points: per-service stages built on the engine, and the batch pipeline
//! chaining them.
//!
//! ## Available Workflows
//!
//! - **Service Profiles** ([`services`]) - Endpoint tables, auth schemes and status
//!   vocabularies of the CATH and SWISS-MODEL services
//! - **Stage Manager** ([`manager`]) - Credentials, client and job protocol for one stage, with
//!   token persistence in the stage's own config section
//! - **Template Selection** ([`select_template`]) - Sequence to resolved hits and their
//!   template alignments
//! - **Homology Modelling** ([`homology_model`]) - Alignment to model coordinates
//! - **Pipeline** ([`pipeline`]) - FASTA batch through both stages, one output directory per
//!   sequence
//!
//! ## Usage Pattern
//!
//! 1. Build [`manager::StageSettings`] (or [`pipeline::PipelineSettings`]) for the run
//! 2. Resolve credentials through [`manager::StageCredentials`]
//! 3. Run the stage or the pipeline with a [`crate::engine::job::Sleeper`] and an optional
//!    progress callback

pub mod homology_model;
pub mod manager;
pub mod pipeline;
pub mod select_template;
pub mod services;
