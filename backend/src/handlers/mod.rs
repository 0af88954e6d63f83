//! HTTP request handlers

pub mod announcement;
pub mod auth;
pub mod ballot;
pub mod budget;
pub mod condominium;
pub mod document;
pub mod health;
pub mod initiative;
pub mod maintenance;
pub mod member;
pub mod notification;
pub mod project;

pub use announcement::*;
pub use auth::*;
pub use ballot::*;
pub use budget::*;
pub use condominium::*;
pub use document::*;
pub use health::*;
pub use initiative::*;
pub use maintenance::*;
pub use member::*;
pub use notification::*;
pub use project::*;
