//! Code execution service
//!
//! The facade external callers touch: one provider instance bound to the
//! initialize/execute/cleanup lifecycle, plus free helpers for one-shot
//! execution with automatic provider selection.

use tracing::{debug, warn};

use crate::config::WorkspaceKind;
use crate::error::{Error, Result};
use crate::workspace::{
    best_provider_for_language, get_enhanced_provider, languages, CodeOptions, EnhancedWorkspace,
    ExecuteOptions, ExecuteResult, PackageManager, WorkspaceOptions,
};

/// High-level service for executing code through one workspace provider
///
/// Construct with a backend kind, `initialize()` to attach the session,
/// reuse it across calls, and `cleanup()` to tear it down. Exactly one
/// provider session exists per service instance.
pub struct CodeExecutionService {
    kind: WorkspaceKind,
    options: WorkspaceOptions,
    workspace: Option<Box<dyn EnhancedWorkspace>>,
}

impl CodeExecutionService {
    /// Create a service bound to the given backend kind
    pub fn new(kind: WorkspaceKind, options: WorkspaceOptions) -> Self {
        CodeExecutionService {
            kind,
            options,
            workspace: None,
        }
    }

    /// Construct the provider and attach its session
    pub async fn initialize(&mut self) -> Result<()> {
        let workspace = get_enhanced_provider(self.kind, &self.options)?;
        workspace.connect().await?;
        debug!(kind = %self.kind, "code execution service initialized");
        self.workspace = Some(workspace);
        Ok(())
    }

    fn workspace(&self) -> Result<&dyn EnhancedWorkspace> {
        self.workspace
            .as_deref()
            .ok_or_else(|| Error::Workspace("Service not initialized".to_string()))
    }

    /// Execute a command in the workspace
    pub async fn execute(
        &self,
        command: &str,
        args: &[String],
        options: Option<&ExecuteOptions>,
    ) -> Result<ExecuteResult> {
        self.workspace()?.execute(command, args, options).await
    }

    /// Execute source code in the given language
    pub async fn execute_code(
        &self,
        code: &str,
        language: &str,
        options: &CodeOptions,
    ) -> Result<ExecuteResult> {
        self.workspace()?.execute_code(code, language, options).await
    }

    /// Install packages one by one, returning a result per package
    ///
    /// The manager is the typed enum, so unknown managers are rejected at
    /// parse time, before anything is dispatched.
    pub async fn install_packages(
        &self,
        manager: PackageManager,
        packages: &[String],
    ) -> Result<Vec<ExecuteResult>> {
        let workspace = self.workspace()?;

        if !workspace.supports_package_management() {
            return Ok(vec![ExecuteResult::failure(
                format!(
                    "Package installation is not supported by the {} workspace",
                    workspace.name()
                ),
                0,
            )]);
        }

        let mut results = Vec::with_capacity(packages.len());
        for package in packages {
            results.push(workspace.install_package(manager, package, None).await?);
        }
        Ok(results)
    }

    /// Read a file from the workspace
    pub async fn read_file(&self, path: &str) -> Result<String> {
        self.workspace()?.read_file(path).await
    }

    /// Write a file into the workspace
    pub async fn write_file(&self, path: &str, content: &str) -> Result<()> {
        self.workspace()?.write_file(path, content).await
    }

    /// Delete a file from the workspace
    pub async fn delete_file(&self, path: &str) -> Result<()> {
        self.workspace()?.delete_file(path).await
    }

    /// List directory entries in the workspace
    pub async fn list_dir(&self, path: &str) -> Result<Vec<String>> {
        self.workspace()?.list_dir(path).await
    }

    /// Tear down the provider session (idempotent)
    pub async fn cleanup(&mut self) -> Result<()> {
        if let Some(workspace) = self.workspace.take() {
            workspace.disconnect().await?;
        }
        Ok(())
    }
}

/// Execute code once with automatic provider selection
///
/// All failures, including selection and connection problems, are encoded
/// in the returned result.
pub async fn execute_code(
    code: &str,
    language: &str,
    options: &CodeOptions,
    workspace_options: &WorkspaceOptions,
) -> ExecuteResult {
    let Some(lang) = languages::language_info(language) else {
        return ExecuteResult::failure(
            format!(
                "Unsupported language: {}. Supported: {}",
                language,
                languages::supported_ids().join(", ")
            ),
            0,
        );
    };

    let provider = match best_provider_for_language(lang.id, workspace_options).await {
        Ok(provider) => provider,
        Err(e) => return ExecuteResult::failure(e.to_string(), 0),
    };

    if let Err(e) = provider.connect().await {
        return ExecuteResult::failure(e.to_string(), 0);
    }

    let result = provider.execute_code(code, lang.id, options).await;

    if let Err(e) = provider.disconnect().await {
        warn!(error = %e, "workspace disconnect failed");
    }

    match result {
        Ok(result) => result,
        Err(e) => ExecuteResult::failure(e.to_string(), 0),
    }
}

/// Execute code once with an explicitly chosen provider
pub async fn execute_code_with_provider(
    code: &str,
    language: &str,
    kind: WorkspaceKind,
    options: &CodeOptions,
    workspace_options: &WorkspaceOptions,
) -> ExecuteResult {
    let Some(lang) = languages::language_info(language) else {
        return ExecuteResult::failure(format!("Unsupported language: {}", language), 0);
    };

    let provider = match get_enhanced_provider(kind, workspace_options) {
        Ok(provider) => provider,
        Err(e) => return ExecuteResult::failure(e.to_string(), 0),
    };

    if let Err(e) = provider.connect().await {
        return ExecuteResult::failure(e.to_string(), 0);
    }

    let result = provider.execute_code(code, lang.id, options).await;

    if let Err(e) = provider.disconnect().await {
        warn!(error = %e, "workspace disconnect failed");
    }

    match result {
        Ok(result) => result,
        Err(e) => ExecuteResult::failure(e.to_string(), 0),
    }
}

/// Render an execution result for display
pub fn format_execution_result(result: &ExecuteResult) -> String {
    let mut parts = Vec::new();

    if !result.stdout.is_empty() {
        parts.push(result.stdout.clone());
    }
    if !result.stderr.is_empty() {
        parts.push(format!("\n[stderr]\n{}", result.stderr));
    }
    if result.timed_out {
        parts.push("\n[Execution timed out]".to_string());
    }
    parts.push(format!(
        "\n[Exit code: {}] [Time: {}ms]",
        result.exit_code, result.execution_time_ms
    ));

    parts.join("")
}

/// Extract code and an optional language tag from a fenced markdown block
///
/// Input that is not a fenced block is returned unchanged with no language.
pub fn extract_code_from_markdown(markdown: &str) -> (String, Option<String>) {
    let trimmed = markdown.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return (trimmed.to_string(), None);
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return (trimmed.to_string(), None);
    };

    let (first_line, body) = match inner.split_once('\n') {
        Some((first, body)) => (first.trim(), body),
        None => ("", inner),
    };

    let language = if !first_line.is_empty()
        && first_line
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Some(first_line.to_lowercase())
    } else {
        None
    };

    (body.trim().to_string(), language)
}

/// Language tag of a fenced block, if present and supported
pub fn parse_language_from_markdown(markdown: &str) -> Option<String> {
    let (_, language) = extract_code_from_markdown(markdown);
    language.filter(|lang| languages::is_supported(lang))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn remote_options(server: &MockServer) -> WorkspaceOptions {
        WorkspaceOptions {
            base_url: Some(server.uri()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_calls_before_initialize_are_rejected() {
        let service =
            CodeExecutionService::new(WorkspaceKind::Remote, WorkspaceOptions::default());
        assert!(matches!(
            service.execute("echo", &[], None).await,
            Err(Error::Workspace(_))
        ));
        assert!(matches!(
            service.read_file("/x").await,
            Err(Error::Workspace(_))
        ));
    }

    #[tokio::test]
    async fn test_initialize_rejects_docker() {
        let mut service = CodeExecutionService::new(
            WorkspaceKind::Docker,
            WorkspaceOptions {
                image_name: Some("python:3.11-slim".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(service.initialize().await, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_facade_lifecycle_with_remote() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "run": {"stdout": "2\n", "code": 0}
            })))
            .mount(&server)
            .await;

        let mut service =
            CodeExecutionService::new(WorkspaceKind::Remote, remote_options(&server));
        service.initialize().await.unwrap();

        let result = service
            .execute_code("print(1+1)", "python", &CodeOptions::new())
            .await
            .unwrap();
        assert_eq!(result.stdout, "2\n");
        assert_eq!(result.exit_code, 0);

        service.cleanup().await.unwrap();
        // Second cleanup is a no-op.
        service.cleanup().await.unwrap();
        assert!(service.execute("echo", &[], None).await.is_err());
    }

    #[tokio::test]
    async fn test_install_packages_unsupported_encoded_in_result() {
        let server = MockServer::start().await;
        let mut service =
            CodeExecutionService::new(WorkspaceKind::Remote, remote_options(&server));
        service.initialize().await.unwrap();

        let results = service
            .install_packages(PackageManager::Pip, &["requests".to_string()])
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].exit_code, 1);
        assert!(results[0].stderr.contains("not supported"));
    }

    #[tokio::test]
    async fn test_one_shot_execute_code_unknown_language() {
        let result = execute_code(
            "whatever",
            "cobol77",
            &CodeOptions::new(),
            &WorkspaceOptions::default(),
        )
        .await;
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("Unsupported language"));
        assert!(result.stderr.contains("python"));
    }

    #[tokio::test]
    async fn test_one_shot_execute_code_selects_remote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/runtimes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/execute"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "run": {"stdout": "hello\n", "code": 0}
            })))
            .mount(&server)
            .await;

        let result = execute_code(
            "print('hello')",
            "py",
            &CodeOptions::new(),
            &remote_options(&server),
        )
        .await;
        assert_eq!(result.stdout, "hello\n");
        assert_eq!(result.exit_code, 0);
    }

    #[test]
    fn test_format_execution_result() {
        let result = ExecuteResult {
            stdout: "out".to_string(),
            stderr: "err".to_string(),
            exit_code: 3,
            signal: None,
            timed_out: true,
            execution_time_ms: 12,
        };
        let rendered = format_execution_result(&result);
        assert!(rendered.contains("out"));
        assert!(rendered.contains("[stderr]\nerr"));
        assert!(rendered.contains("[Execution timed out]"));
        assert!(rendered.contains("[Exit code: 3] [Time: 12ms]"));
    }

    #[test]
    fn test_extract_code_from_markdown() {
        let (code, lang) = extract_code_from_markdown("```python\nprint(1)\n```");
        assert_eq!(code, "print(1)");
        assert_eq!(lang.as_deref(), Some("python"));

        let (code, lang) = extract_code_from_markdown("```\nplain\n```");
        assert_eq!(code, "plain");
        assert_eq!(lang, None);

        let (code, lang) = extract_code_from_markdown("no fences here");
        assert_eq!(code, "no fences here");
        assert_eq!(lang, None);
    }

    #[test]
    fn test_parse_language_from_markdown() {
        assert_eq!(
            parse_language_from_markdown("```python\nprint(1)\n```").as_deref(),
            Some("python")
        );
        // A tag that is not a supported language is dropped.
        assert_eq!(parse_language_from_markdown("```nope\nx\n```"), None);
        assert_eq!(parse_language_from_markdown("plain text"), None);
    }
}
