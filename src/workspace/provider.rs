//! Workspace provider contract and execution result types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::WorkspaceKind;
use crate::error::Result;
use crate::workspace::languages::PackageManager;

/// Exit code reported when an execution was killed for exceeding its
/// deadline, matching the shell convention for `timeout`-style kills.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Default per-execution timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default per-execution memory limit in megabytes
pub const DEFAULT_MEMORY_LIMIT_MB: u64 = 256;

/// Result of executing a command or code snippet
///
/// Partial output is always carried, even on failure, so callers can show
/// what was captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResult {
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
    /// Process exit code; [`TIMEOUT_EXIT_CODE`] when killed for a timeout
    pub exit_code: i32,
    /// Terminating signal name, when the process was signaled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,
    /// Whether the execution was terminated for exceeding its deadline
    #[serde(default)]
    pub timed_out: bool,
    /// Wall-clock execution time in milliseconds
    #[serde(default)]
    pub execution_time_ms: u64,
}

impl ExecuteResult {
    /// Successful result with captured output
    pub fn success(stdout: String, stderr: String, execution_time_ms: u64) -> Self {
        ExecuteResult {
            stdout,
            stderr,
            exit_code: 0,
            signal: None,
            timed_out: false,
            execution_time_ms,
        }
    }

    /// Failure encoded in the result rather than returned as an error
    pub fn failure(stderr: impl Into<String>, execution_time_ms: u64) -> Self {
        ExecuteResult {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code: 1,
            signal: None,
            timed_out: false,
            execution_time_ms,
        }
    }

    /// Timeout result carrying any partial output
    pub fn timeout(
        stdout: String,
        stderr: String,
        signal: Option<String>,
        execution_time_ms: u64,
    ) -> Self {
        ExecuteResult {
            stdout,
            stderr,
            exit_code: TIMEOUT_EXIT_CODE,
            signal,
            timed_out: true,
            execution_time_ms,
        }
    }

    /// Whether the execution completed with exit code 0
    pub fn ok(&self) -> bool {
        self.exit_code == 0 && !self.timed_out
    }
}

/// Options for plain command execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Working directory
    pub cwd: Option<String>,
    /// Extra environment variables
    pub env: HashMap<String, String>,
    /// Run timeout in seconds (enforced by backends that support it)
    pub timeout_secs: Option<u64>,
    /// Data piped to the process on stdin
    pub stdin: Option<String>,
}

/// Options for language-aware code execution
#[derive(Debug, Clone, Default)]
pub struct CodeOptions {
    /// Common execution options
    pub execute: ExecuteOptions,
    /// Override the registry's pinned runtime version
    pub version: Option<String>,
    /// Run memory limit in megabytes
    pub memory_limit_mb: Option<u64>,
}

impl CodeOptions {
    pub fn new() -> Self {
        CodeOptions::default()
    }

    /// Set stdin
    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.execute.stdin = Some(stdin.into());
        self
    }

    /// Set the run timeout in seconds
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.execute.timeout_secs = Some(secs);
        self
    }

    /// Set the run memory limit in megabytes
    pub fn with_memory_limit_mb(mut self, mb: u64) -> Self {
        self.memory_limit_mb = Some(mb);
        self
    }

    /// Override the runtime version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Effective timeout in seconds
    pub fn timeout_secs(&self) -> u64 {
        self.execute.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    /// Effective memory limit in megabytes
    pub fn memory_limit_mb(&self) -> u64 {
        self.memory_limit_mb.unwrap_or(DEFAULT_MEMORY_LIMIT_MB)
    }
}

/// Contract every execution backend implements
///
/// `connect` is idempotent and fails with a connectivity error when the
/// backend is unreachable; `disconnect` never fails on an already
/// disconnected workspace. File operations target the real filesystem or an
/// in-memory map depending on the backend. Execution-level failures are
/// encoded in [`ExecuteResult`], never returned as `Err`.
///
/// None of the backends serialize concurrent `execute` calls internally;
/// one in-flight execution per instance is a caller obligation.
#[async_trait]
pub trait WorkspaceProvider: Send + Sync {
    /// Backend kind
    fn kind(&self) -> WorkspaceKind;

    /// Human-readable provider name
    fn name(&self) -> &str;

    /// Attach to the backend (idempotent)
    async fn connect(&self) -> Result<()>;

    /// Detach from the backend (must not fail if already disconnected)
    async fn disconnect(&self) -> Result<()>;

    /// Read a file's contents
    async fn read_file(&self, path: &str) -> Result<String>;

    /// Write (create or replace) a file
    async fn write_file(&self, path: &str, content: &str) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &str) -> Result<()>;

    /// List directory entries
    async fn list_dir(&self, path: &str) -> Result<Vec<String>>;

    /// Check whether a file exists
    async fn file_exists(&self, path: &str) -> Result<bool>;

    /// Execute a command with arguments
    async fn execute(
        &self,
        command: &str,
        args: &[String],
        options: Option<&ExecuteOptions>,
    ) -> Result<ExecuteResult>;
}

/// Capability-aware provider that can run source code by language
#[async_trait]
pub trait EnhancedWorkspace: WorkspaceProvider {
    /// Canonical ids of languages this provider can run
    fn supported_languages(&self) -> Vec<&'static str>;

    /// Whether `install_package` is supported
    fn supports_package_management(&self) -> bool {
        false
    }

    /// Cheap health probe; implementations cache the answer
    async fn is_available(&self) -> bool;

    /// Execute source code in the given language
    ///
    /// Unsupported languages and backend failures come back as an
    /// [`ExecuteResult`] with a non-zero exit code, not as `Err`.
    async fn execute_code(
        &self,
        code: &str,
        language: &str,
        options: &CodeOptions,
    ) -> Result<ExecuteResult>;

    /// Install a package through the given package manager
    async fn install_package(
        &self,
        manager: PackageManager,
        package: &str,
        version: Option<&str>,
    ) -> Result<ExecuteResult> {
        let _ = (package, version);
        Ok(ExecuteResult::failure(
            format!(
                "Package installation via {} is not supported by the {} workspace",
                manager,
                self.name()
            ),
            0,
        ))
    }

    /// List installed packages for the given package manager
    async fn list_packages(&self, manager: PackageManager) -> Result<Vec<String>> {
        let _ = manager;
        Ok(Vec::new())
    }
}
