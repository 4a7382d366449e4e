//! Tool-call surface over the catalog HTTP API.
//!
//! Each tool maps 1:1 onto an HTTP endpoint and always answers with a
//! [`ToolEnvelope`] instead of failing.

pub mod client;
pub mod config;
pub mod envelope;
pub mod registry;
pub mod table;

pub use client::{ApiClient, ClientError};
pub use config::ToolsConfig;
pub use envelope::ToolEnvelope;
pub use registry::{ToolRegistry, ToolSpec};
