//! External service integrations

pub mod storage;
pub mod workflow;

pub use storage::{SignedUrl, UrlSigner};
pub use workflow::WorkflowClient;
