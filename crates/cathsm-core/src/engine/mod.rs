//! # Engine Module
//!
//! The protocol core shared by every remote service: a job is submitted once, its status is
//! polled until the server reports a terminal value, and its results are fetched.
//!
//! ## Architecture
//!
//! - **Job Lifecycle** ([`job`]) - The `NotSubmitted → Submitted → Polling → Completed | Failed`
//!   state machine, the per-service [`job::JobProtocol`] and the [`job::PollPolicy`] bounding
//!   the status loop
//! - **Progress Monitoring** ([`progress`]) - Events forwarded to an optional callback
//! - **Error Handling** ([`error`]) - The aggregated [`error::EngineError`] taxonomy
//!
//! Sleeping between status checks goes through the [`job::Sleeper`] trait, which is the only
//! place the engine blocks besides the network.

pub mod error;
pub mod job;
pub mod progress;
