//! interviewer-core: adaptive interview engine (planning, evaluation, completion).
//!
//! This crate defines the data model, the gateway and repository ports, and the
//! engine components built on them. Concrete model backends live in
//! `interviewer-providers`.

pub mod completion;
pub mod error;
pub mod evaluator;
pub mod keywords;
pub mod lifecycle;
pub mod mock;
pub mod model;
pub mod parser;
pub mod planner;
pub mod report;
pub mod scoring;
pub mod service;
pub mod store;
pub mod traits;

pub use error::{GatewayError, InterviewError, InterviewResult};
pub use service::{InterviewService, ServiceConfig};
