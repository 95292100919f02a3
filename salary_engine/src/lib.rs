//! Salary Engine library crate.
//!
//! This crate evaluates salary components, keeps the editable state
//! of an employee's salary assignment, generates payslips and
//! summarises them per month.  The calculation modules are pure and
//! synchronous; [`api::build_router`] wraps them in a JSON HTTP API
//! for the payroll console.

pub mod aggregator;
pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod models;
pub mod payrun;
pub mod summarizer;
pub mod tax;
pub mod telemetry;
pub mod wire;

pub use aggregator::{aggregate, AssignmentDraft, AssignmentEdit};
pub use catalog::ComponentCatalog;
pub use error::{ApiError, CatalogError, EngineError};
pub use evaluator::{evaluate, evaluate_structure, StructureEvaluation, ValidationWarning};
pub use summarizer::{summarize, summarize_period};
