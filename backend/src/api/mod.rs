//! HTTP API module.
//!
//! The axum server, its JSON response types, and the log broadcaster the
//! pipeline reports through.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server};
pub use types::*;
