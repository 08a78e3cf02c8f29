//! Salary Engine library crate.
//!
//! This crate exposes the compensation resolver and its collaborators
//! as reusable modules.  Applications can call
//! `resolver::resolve_from_ctc` directly, drive an editor session with
//! `reconcile::SalaryDraft` and `reconcile::PreviewPipeline`, or embed
//! the HTTP surface via `api::build_router`.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod persistence;
pub mod preview;
pub mod reconcile;
pub mod resolver;
pub mod statutory;
pub mod validation;

pub use error::{SalaryError, SalaryResult};
pub use models::{CompensationBreakdown, CompensationInput, Money};
pub use resolver::Resolver;
