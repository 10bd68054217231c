//! HTTP API module.
//!
//! This module provides the HTTP server, its JSON types and the processing
//! log broadcaster.

pub mod server;
pub mod types;
pub mod logs;

pub use server::{router, start_server};
pub use types::*;
pub use logs::*;
