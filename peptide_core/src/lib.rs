#![forbid(unsafe_code)]

//! Core domain model and calculations for the peptide toolkit.
//!
//! This crate provides:
//! - Domain types (doses, syringes, protocol and order records)
//! - Static reference tables
//! - The reconstitution/dose engine
//! - Purchase order builder
//! - Local persistence and configuration

pub mod types;
pub mod error;
pub mod tables;
pub mod config;
pub mod logging;
pub mod engine;
pub mod protocol;
pub mod order;
pub mod store;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use engine::{compute_dosage, recommend_diluent, DiluentCandidate};
pub use order::OrderBuilder;
pub use store::LocalStore;
