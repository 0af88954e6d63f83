//! Shared types and rules for the Condominium Management Platform
//!
//! This crate contains the domain types and pure decision rules used by the
//! backend and by the browser client (via WASM).

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
