//! Local process workspace
//!
//! Executes directly on the host against the real filesystem. There is no
//! isolation: this backend is intended for trusted internal invocations
//! only, never for arbitrary untrusted code. No timeout is enforced here;
//! callers wrap calls in their own deadline and disconnect on expiry.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::config::WorkspaceKind;
use crate::error::Result;
use crate::workspace::languages::{self, PackageManager};
use crate::workspace::provider::{
    CodeOptions, EnhancedWorkspace, ExecuteOptions, ExecuteResult, WorkspaceProvider,
};

/// Languages the host can run through a direct interpreter invocation
const LOCAL_LANGUAGES: &[&str] = &[
    "python",
    "javascript",
    "typescript",
    "ruby",
    "php",
    "perl",
    "lua",
    "bash",
    "r",
];

/// Workspace provider executing on the host via the OS process API
#[derive(Debug, Default)]
pub struct LocalWorkspace;

impl LocalWorkspace {
    pub fn new() -> Self {
        LocalWorkspace
    }

    /// Interpreter invocation for a canonical language id
    fn interpreter_argv(&self, language: &str, code: &str) -> Option<Vec<String>> {
        let argv: Vec<&str> = match language {
            "python" => vec!["python3", "-c", code],
            "javascript" => vec!["node", "-e", code],
            "typescript" => {
                // Prefer deno, fall back to ts-node if installed.
                if which::which("deno").is_ok() {
                    vec!["deno", "eval", code]
                } else if which::which("ts-node").is_ok() {
                    vec!["ts-node", "-e", code]
                } else {
                    return None;
                }
            }
            "ruby" => vec!["ruby", "-e", code],
            "php" => vec!["php", "-r", code],
            "perl" => vec!["perl", "-e", code],
            "lua" => vec!["lua", "-e", code],
            "bash" => vec!["bash", "-c", code],
            "r" => vec!["Rscript", "-e", code],
            _ => return None,
        };
        Some(argv.into_iter().map(|s| s.to_string()).collect())
    }

    /// Spawn an argv directly (no shell), capturing output and exit state
    async fn spawn_argv(
        &self,
        argv: &[String],
        options: Option<&ExecuteOptions>,
    ) -> Result<ExecuteResult> {
        let start = Instant::now();

        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(opts) = options {
            if let Some(cwd) = &opts.cwd {
                command.current_dir(cwd);
            }
            for (key, value) in &opts.env {
                command.env(key, value);
            }
        }

        debug!(command = %argv.join(" "), "executing on host");

        let mut child = match command.spawn() {
            Ok(child) => child,
            // A missing binary is an execution failure, not a crate error.
            Err(e) => {
                return Ok(ExecuteResult::failure(
                    e.to_string(),
                    start.elapsed().as_millis() as u64,
                ))
            }
        };

        if let Some(stdin_data) = options.and_then(|opts| opts.stdin.as_ref()) {
            if let Some(mut stdin) = child.stdin.take() {
                let data = stdin_data.clone();
                // Written concurrently with output collection: a child that
                // fills its stdout pipe while we are still writing stdin
                // would otherwise deadlock, and a child that exits without
                // draining stdin turns the write into a broken pipe, which
                // is not a failure of the execution.
                tokio::spawn(async move {
                    let _ = stdin.write_all(data.as_bytes()).await;
                });
            }
        }

        let output = child.wait_with_output().await?;
        let execution_time_ms = start.elapsed().as_millis() as u64;

        let signal = signal_name(&output.status);
        let exit_code = output
            .status
            .code()
            .unwrap_or(if signal.is_some() { 1 } else { 0 });

        Ok(ExecuteResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code,
            signal,
            timed_out: false,
            execution_time_ms,
        })
    }
}

#[cfg(unix)]
fn signal_name(status: &std::process::ExitStatus) -> Option<String> {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|sig| match sig {
        2 => "SIGINT".to_string(),
        9 => "SIGKILL".to_string(),
        15 => "SIGTERM".to_string(),
        other => format!("signal {}", other),
    })
}

#[cfg(not(unix))]
fn signal_name(_status: &std::process::ExitStatus) -> Option<String> {
    None
}

#[async_trait]
impl WorkspaceProvider for LocalWorkspace {
    fn kind(&self) -> WorkspaceKind {
        WorkspaceKind::Local
    }

    fn name(&self) -> &str {
        "Local Execution"
    }

    async fn connect(&self) -> Result<()> {
        // Stateless; nothing to attach.
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        Ok(tokio::fs::read_to_string(path).await?)
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        Ok(tokio::fs::write(path, content).await?)
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        Ok(tokio::fs::remove_file(path).await?)
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(path).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();
        Ok(names)
    }

    async fn file_exists(&self, path: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(path).await?)
    }

    async fn execute(
        &self,
        command: &str,
        args: &[String],
        options: Option<&ExecuteOptions>,
    ) -> Result<ExecuteResult> {
        // One shell line so builtins and operators behave as typed.
        let mut line = command.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        let argv = vec!["sh".to_string(), "-c".to_string(), line];
        self.spawn_argv(&argv, options).await
    }
}

#[async_trait]
impl EnhancedWorkspace for LocalWorkspace {
    fn supported_languages(&self) -> Vec<&'static str> {
        LOCAL_LANGUAGES.to_vec()
    }

    fn supports_package_management(&self) -> bool {
        true
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn execute_code(
        &self,
        code: &str,
        language: &str,
        options: &CodeOptions,
    ) -> Result<ExecuteResult> {
        let lang_id = languages::language_info(language)
            .map(|lang| lang.id)
            .unwrap_or(language);

        let Some(argv) = self.interpreter_argv(lang_id, code) else {
            return Ok(ExecuteResult::failure(
                format!(
                    "Cannot execute {} code directly on the host. Supported: {}",
                    language,
                    LOCAL_LANGUAGES.join(", ")
                ),
                0,
            ));
        };

        self.spawn_argv(&argv, Some(&options.execute)).await
    }

    async fn install_package(
        &self,
        manager: PackageManager,
        package: &str,
        version: Option<&str>,
    ) -> Result<ExecuteResult> {
        let argv = manager.install_command(package, version);
        self.spawn_argv(&argv, None).await
    }

    async fn list_packages(&self, manager: PackageManager) -> Result<Vec<String>> {
        let result = self.spawn_argv(&manager.list_command(), None).await?;
        if !result.ok() {
            return Ok(Vec::new());
        }
        Ok(result
            .stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_shell_exit_code_propagates() {
        let ws = LocalWorkspace::new();
        let result = ws
            .execute("exit", &["7".to_string()], None)
            .await
            .unwrap();
        assert_eq!(result.exit_code, 7);
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn test_execute_captures_stdout() {
        let ws = LocalWorkspace::new();
        let result = ws
            .execute("echo", &["hello".to_string()], None)
            .await
            .unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "hello\n");
    }

    #[tokio::test]
    async fn test_stdin_is_piped() {
        let ws = LocalWorkspace::new();
        let opts = ExecuteOptions {
            stdin: Some("piped input".to_string()),
            ..Default::default()
        };
        let result = ws.execute("cat", &[], Some(&opts)).await.unwrap();
        assert_eq!(result.stdout, "piped input");
    }

    #[tokio::test]
    async fn test_unread_oversized_stdin_is_not_an_error() {
        let ws = LocalWorkspace::new();
        // Larger than any pipe buffer, given to a child that never reads
        // stdin and exits immediately.
        let opts = ExecuteOptions {
            stdin: Some("x".repeat(1 << 20)),
            ..Default::default()
        };
        let result = ws.execute("true", &[], Some(&opts)).await.unwrap();
        assert_eq!(result.exit_code, 0);
        assert!(!result.timed_out);
    }

    #[tokio::test]
    async fn test_large_stdin_roundtrips_through_child() {
        let ws = LocalWorkspace::new();
        let data = "y".repeat(1 << 20);
        let opts = ExecuteOptions {
            stdin: Some(data.clone()),
            ..Default::default()
        };
        // `cat` echoes stdin back, so the write and the read must overlap.
        let result = ws.execute("cat", &[], Some(&opts)).await.unwrap();
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout.len(), data.len());
    }

    #[tokio::test]
    async fn test_missing_binary_is_result_not_error() {
        let ws = LocalWorkspace::new();
        let argv = vec!["definitely-not-a-real-binary-xyz".to_string()];
        let result = ws.spawn_argv(&argv, None).await.unwrap();
        assert_eq!(result.exit_code, 1);
        assert!(!result.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_execute_code_bash() {
        let ws = LocalWorkspace::new();
        let result = ws
            .execute_code("echo from-bash", "bash", &CodeOptions::new())
            .await
            .unwrap();
        assert_eq!(result.exit_code, 0);
        assert!(result.stdout.contains("from-bash"));
    }

    #[tokio::test]
    async fn test_execute_code_unsupported_language() {
        let ws = LocalWorkspace::new();
        let result = ws
            .execute_code("fn main() {}", "rust", &CodeOptions::new())
            .await
            .unwrap();
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("python"));
    }

    #[tokio::test]
    async fn test_file_roundtrip() {
        let dir = tempdir().unwrap();
        let ws = LocalWorkspace::new();
        let path = dir.path().join("note.txt");
        let path = path.to_str().unwrap();

        ws.write_file(path, "contents").await.unwrap();
        assert!(ws.file_exists(path).await.unwrap());
        assert_eq!(ws.read_file(path).await.unwrap(), "contents");

        let listing = ws
            .list_dir(dir.path().to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(listing, vec!["note.txt"]);

        ws.delete_file(path).await.unwrap();
        assert!(!ws.file_exists(path).await.unwrap());
    }
}
