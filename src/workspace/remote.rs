//! Remote sandbox workspace
//!
//! Posts source files to a Piston-compatible HTTP execution service. Files
//! live in an instance-scoped in-memory map for the lifetime of the
//! workspace; nothing is persisted. The service runs a compile phase and a
//! run phase; failures in either are reported distinctly, and a run killed
//! by SIGKILL/SIGTERM is normalized to the canonical timeout shape
//! (`timed_out = true`, exit code 124).
//!
//! `execute_code` never fails with `Err` for execution-level problems:
//! unsupported languages, non-2xx responses, and transport errors all come
//! back encoded in the returned [`ExecuteResult`].

use async_trait::async_trait;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::WorkspaceKind;
use crate::error::{Error, Result};
use crate::workspace::languages::{self, LanguageInfo};
use crate::workspace::provider::{
    CodeOptions, EnhancedWorkspace, ExecuteOptions, ExecuteResult, WorkspaceProvider,
};

/// Public Piston API, used when no base URL is configured
pub const DEFAULT_BASE_URL: &str = "https://emkc.org/api/v2/piston";

/// Fixed compile-phase timeout, in milliseconds
const COMPILE_TIMEOUT_MS: u64 = 10_000;

/// How long an availability probe result is trusted
const AVAILABILITY_TTL: Duration = Duration::from_secs(60);

/// A runtime advertised by the execution service
#[derive(Debug, Clone, Deserialize)]
pub struct Runtime {
    pub language: String,
    pub version: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RemoteFile {
    name: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ExecuteRequestBody {
    language: String,
    version: String,
    files: Vec<RemoteFile>,
    stdin: String,
    compile_timeout: u64,
    run_timeout: u64,
    compile_memory_limit: i64,
    run_memory_limit: i64,
}

#[derive(Debug, Default, Deserialize)]
struct PhaseResult {
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    #[serde(default)]
    output: String,
    code: Option<i32>,
    signal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExecuteResponseBody {
    compile: Option<PhaseResult>,
    #[serde(default)]
    run: PhaseResult,
}

/// Workspace provider backed by a remote Piston-compatible sandbox
pub struct RemoteWorkspace {
    client: reqwest::Client,
    base_url: String,
    /// Virtual files, alive only for this instance
    files: Mutex<HashMap<String, String>>,
    /// Availability probe result, trusted for [`AVAILABILITY_TTL`]
    availability: Cache<(), bool>,
}

impl RemoteWorkspace {
    /// Create a provider targeting the given API base URL
    pub fn new(base_url: &str) -> Result<Self> {
        url::Url::parse(base_url)?;
        Ok(RemoteWorkspace {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            files: Mutex::new(HashMap::new()),
            availability: Cache::builder()
                .max_capacity(1)
                .time_to_live(AVAILABILITY_TTL)
                .build(),
        })
    }

    /// Fetch the runtimes advertised by the service
    pub async fn get_runtimes(&self) -> Result<Vec<Runtime>> {
        let response = self
            .client
            .get(format!("{}/runtimes", self.base_url))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Remote(format!(
                "Runtime listing failed: {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    /// POST the execute request and map the two-phase response
    ///
    /// Non-2xx responses are encoded in the returned result; only transport
    /// and decode problems surface as `Err` (the caller converts those to a
    /// failure result too).
    async fn post_execute(&self, body: &ExecuteRequestBody) -> Result<ExecuteResult> {
        let response = self
            .client
            .post(format!("{}/execute", self.base_url))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Ok(ExecuteResult::failure(
                format!("Execution service error: {} - {}", status, text),
                0,
            ));
        }

        let payload: ExecuteResponseBody = response.json().await?;

        // A failed compile phase ends the execution; surface it as-is so
        // callers can tell a compile error from a runtime failure.
        if let Some(compile) = payload.compile {
            let compile_code = compile.code.unwrap_or(0);
            if compile_code != 0 {
                let stderr = if !compile.stderr.is_empty() {
                    compile.stderr
                } else if !compile.output.is_empty() {
                    compile.output
                } else {
                    "Compilation failed".to_string()
                };
                return Ok(ExecuteResult {
                    stdout: compile.stdout,
                    stderr,
                    exit_code: compile_code,
                    signal: compile.signal,
                    timed_out: false,
                    execution_time_ms: 0,
                });
            }
        }

        let run = payload.run;

        // The service reports a deadline kill only through the signal; fold
        // it into the canonical timeout shape.
        if matches!(run.signal.as_deref(), Some("SIGKILL") | Some("SIGTERM")) {
            return Ok(ExecuteResult::timeout(run.stdout, run.stderr, run.signal, 0));
        }

        Ok(ExecuteResult {
            stdout: run.stdout,
            stderr: run.stderr,
            exit_code: run.code.unwrap_or(0),
            signal: run.signal,
            timed_out: false,
            execution_time_ms: 0,
        })
    }

    fn build_request(
        &self,
        code: &str,
        lang: &LanguageInfo,
        options: &CodeOptions,
    ) -> ExecuteRequestBody {
        ExecuteRequestBody {
            language: lang.runtime.to_string(),
            version: options
                .version
                .clone()
                .unwrap_or_else(|| lang.runtime_version.to_string()),
            files: vec![RemoteFile {
                name: format!("main{}", lang.extension),
                content: code.to_string(),
            }],
            stdin: options.execute.stdin.clone().unwrap_or_default(),
            compile_timeout: COMPILE_TIMEOUT_MS,
            run_timeout: options.timeout_secs() * 1000,
            compile_memory_limit: -1,
            run_memory_limit: (options.memory_limit_mb() * 1024 * 1024) as i64,
        }
    }
}

#[async_trait]
impl WorkspaceProvider for RemoteWorkspace {
    fn kind(&self) -> WorkspaceKind {
        WorkspaceKind::Remote
    }

    fn name(&self) -> &str {
        "Remote Sandbox"
    }

    async fn connect(&self) -> Result<()> {
        debug!(base_url = %self.base_url, "remote workspace connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.files.lock().await.clear();
        debug!("remote workspace disconnected");
        Ok(())
    }

    async fn read_file(&self, path: &str) -> Result<String> {
        self.files
            .lock()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("File not found: {}", path)))
    }

    async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        self.files
            .lock()
            .await
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        self.files.lock().await.remove(path);
        Ok(())
    }

    async fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        let files = self.files.lock().await;
        let mut names: Vec<String> = files
            .keys()
            .filter(|name| path == "/" || name.starts_with(path))
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    async fn file_exists(&self, path: &str) -> Result<bool> {
        Ok(self.files.lock().await.contains_key(path))
    }

    async fn execute(
        &self,
        command: &str,
        args: &[String],
        options: Option<&ExecuteOptions>,
    ) -> Result<ExecuteResult> {
        // No process API on the remote side; run the line as bash.
        let mut line = command.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        let code_options = CodeOptions {
            execute: options.cloned().unwrap_or_default(),
            ..Default::default()
        };
        self.execute_code(&line, "bash", &code_options).await
    }
}

#[async_trait]
impl EnhancedWorkspace for RemoteWorkspace {
    fn supported_languages(&self) -> Vec<&'static str> {
        languages::supported_ids()
    }

    async fn is_available(&self) -> bool {
        let client = self.client.clone();
        let url = format!("{}/runtimes", self.base_url);
        self.availability
            .get_with((), async move {
                match client.get(&url).send().await {
                    Ok(response) => response.status().is_success(),
                    Err(e) => {
                        warn!(error = %e, "availability probe failed");
                        false
                    }
                }
            })
            .await
    }

    async fn execute_code(
        &self,
        code: &str,
        language: &str,
        options: &CodeOptions,
    ) -> Result<ExecuteResult> {
        let start = Instant::now();

        let Some(lang) = languages::language_info(language) else {
            return Ok(ExecuteResult::failure(
                format!(
                    "Language '{}' is not supported by the remote sandbox. Supported: {}",
                    language,
                    languages::supported_ids().join(", ")
                ),
                start.elapsed().as_millis() as u64,
            ));
        };

        let body = self.build_request(code, lang, options);

        // Every return path carries wall-clock time, and transport or decode
        // problems become a failure result rather than an error.
        let mut result = match self.post_execute(&body).await {
            Ok(result) => result,
            Err(e) => ExecuteResult::failure(e.to_string(), 0),
        };
        result.execution_time_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }
}
