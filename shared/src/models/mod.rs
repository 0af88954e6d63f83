//! Domain models for the Condominium Management Platform

mod access;
mod ballot;
mod budget;
mod condominium;
mod project;

pub use access::*;
pub use ballot::*;
pub use budget::*;
pub use condominium::*;
pub use project::*;
