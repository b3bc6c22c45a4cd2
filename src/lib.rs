//! # Runbox
//!
//! Pluggable sandboxed code and command execution workspaces.
//!
//! ## Features
//!
//! - **Three backends:** bare local process, long-lived Docker container,
//!   or a remote Piston-compatible HTTP execution service
//! - **One contract:** every backend implements the same connect/file/execute
//!   surface; enhanced backends add language-aware `execute_code`
//! - **Language registry:** canonical language names resolved to backend
//!   runtime identifiers, versions, and file extensions
//! - **Normalized results:** timeouts surface as exit code 124 with
//!   `timed_out` set, and execution failures are encoded in the result
//!   instead of thrown

pub mod config;
pub mod error;
pub mod service;
pub mod workspace;

pub use config::{Config, WorkspaceKind};
pub use error::{Error, Result};
pub use service::CodeExecutionService;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
