//! Workspace provider factory
//!
//! Pure kind-to-constructor mapping plus capability-aware selection.
//! Configuration problems (missing Docker image, invalid remote URL) fail
//! here, before any backend I/O.

use tracing::debug;

use crate::config::{DockerConfig, WorkspaceKind};
use crate::error::{Error, Result};
use crate::workspace::docker::DockerWorkspace;
use crate::workspace::languages;
use crate::workspace::local::LocalWorkspace;
use crate::workspace::provider::{EnhancedWorkspace, WorkspaceProvider};
use crate::workspace::remote::{RemoteWorkspace, DEFAULT_BASE_URL};

/// Construction options for workspace providers
#[derive(Debug, Clone, Default)]
pub struct WorkspaceOptions {
    /// Docker image (required for the docker backend)
    pub image_name: Option<String>,
    /// Remote sandbox base URL (defaults to the public Piston API)
    pub base_url: Option<String>,
    /// Container network mode
    pub network: Option<String>,
    /// Container memory limit in megabytes
    pub memory_limit_mb: Option<i64>,
    /// Container CPU limit in fractional cores
    pub cpu_limit: Option<f64>,
}

impl WorkspaceOptions {
    fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    fn docker_config(&self) -> Result<DockerConfig> {
        let image = self.image_name.clone().ok_or_else(|| {
            Error::Config("Docker workspace requires an image name".to_string())
        })?;
        Ok(DockerConfig {
            image,
            network: self.network.clone().unwrap_or_else(|| "none".to_string()),
            memory_limit_mb: self.memory_limit_mb.unwrap_or(512),
            cpu_limit: self.cpu_limit.unwrap_or(1.0),
        })
    }
}

/// Construct a provider for the given backend kind
pub fn get_workspace_provider(
    kind: WorkspaceKind,
    options: &WorkspaceOptions,
) -> Result<Box<dyn WorkspaceProvider>> {
    match kind {
        WorkspaceKind::Local => Ok(Box::new(LocalWorkspace::new())),
        WorkspaceKind::Docker => Ok(Box::new(DockerWorkspace::new(options.docker_config()?)?)),
        WorkspaceKind::Remote => Ok(Box::new(RemoteWorkspace::new(options.base_url())?)),
    }
}

/// Construct a provider that supports language-aware code execution
pub fn get_enhanced_provider(
    kind: WorkspaceKind,
    options: &WorkspaceOptions,
) -> Result<Box<dyn EnhancedWorkspace>> {
    match kind {
        WorkspaceKind::Local => Ok(Box::new(LocalWorkspace::new())),
        WorkspaceKind::Remote => Ok(Box::new(RemoteWorkspace::new(options.base_url())?)),
        WorkspaceKind::Docker => Err(Error::Config(
            "The docker workspace does not support language-aware code execution".to_string(),
        )),
    }
}

/// Selection priority for capability-aware provider lookup
const SELECTION_ORDER: &[WorkspaceKind] = &[WorkspaceKind::Remote, WorkspaceKind::Local];

/// Pick the first provider that declares the language and answers its
/// availability probe
///
/// The language-support check runs first because it is free; the
/// availability probe can hit the network. Exhausting the list is an
/// explicit error, never a silent default.
pub async fn best_provider_for_language(
    language: &str,
    options: &WorkspaceOptions,
) -> Result<Box<dyn EnhancedWorkspace>> {
    let lang_id = languages::language_info(language)
        .map(|lang| lang.id)
        .unwrap_or(language);

    for &kind in SELECTION_ORDER {
        let Ok(provider) = get_enhanced_provider(kind, options) else {
            continue;
        };
        if !provider
            .supported_languages()
            .iter()
            .any(|id| *id == lang_id)
        {
            continue;
        }
        if !provider.is_available().await {
            debug!(%kind, "provider skipped: availability probe failed");
            continue;
        }
        return Ok(provider);
    }

    Err(Error::InvalidInput(format!(
        "No available workspace provider for language: {}",
        language
    )))
}

/// Availability summary for one provider kind
#[derive(Debug, Clone)]
pub struct ProviderStatus {
    pub kind: WorkspaceKind,
    pub name: String,
    pub available: bool,
    pub supported_languages: Vec<&'static str>,
}

/// Probe every constructible provider
pub async fn list_available_providers(options: &WorkspaceOptions) -> Vec<ProviderStatus> {
    let mut statuses = Vec::new();

    for &kind in &[WorkspaceKind::Local, WorkspaceKind::Remote] {
        match get_enhanced_provider(kind, options) {
            Ok(provider) => statuses.push(ProviderStatus {
                kind,
                name: provider.name().to_string(),
                available: provider.is_available().await,
                supported_languages: provider.supported_languages(),
            }),
            Err(_) => statuses.push(ProviderStatus {
                kind,
                name: kind.to_string(),
                available: false,
                supported_languages: Vec::new(),
            }),
        }
    }

    // The docker backend has no cheap probe; constructibility stands in.
    let docker_options = WorkspaceOptions {
        image_name: options
            .image_name
            .clone()
            .or_else(|| Some("python:3.11-slim".to_string())),
        ..options.clone()
    };
    statuses.push(
        match get_workspace_provider(WorkspaceKind::Docker, &docker_options) {
            Ok(provider) => ProviderStatus {
                kind: WorkspaceKind::Docker,
                name: provider.name().to_string(),
                available: true,
                supported_languages: Vec::new(),
            },
            Err(_) => ProviderStatus {
                kind: WorkspaceKind::Docker,
                name: WorkspaceKind::Docker.to_string(),
                available: false,
                supported_languages: Vec::new(),
            },
        },
    );

    statuses
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_docker_requires_image_before_any_io() {
        let result = get_workspace_provider(WorkspaceKind::Docker, &WorkspaceOptions::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_docker_is_not_enhanced() {
        let options = WorkspaceOptions {
            image_name: Some("python:3.11-slim".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            get_enhanced_provider(WorkspaceKind::Docker, &options),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_local_and_remote_construct() {
        assert!(get_workspace_provider(WorkspaceKind::Local, &WorkspaceOptions::default()).is_ok());
        assert!(
            get_workspace_provider(WorkspaceKind::Remote, &WorkspaceOptions::default()).is_ok()
        );
    }

    #[test]
    fn test_invalid_remote_url_rejected() {
        let options = WorkspaceOptions {
            base_url: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            get_workspace_provider(WorkspaceKind::Remote, &options),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_best_provider_prefers_remote_when_available() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/runtimes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let options = WorkspaceOptions {
            base_url: Some(server.uri()),
            ..Default::default()
        };
        let provider = best_provider_for_language("python", &options).await.unwrap();
        assert_eq!(provider.kind(), WorkspaceKind::Remote);
    }

    #[tokio::test]
    async fn test_best_provider_falls_back_to_local() {
        // Remote probe fails fast against a closed port.
        let options = WorkspaceOptions {
            base_url: Some("http://127.0.0.1:1".to_string()),
            ..Default::default()
        };
        let provider = best_provider_for_language("bash", &options).await.unwrap();
        assert_eq!(provider.kind(), WorkspaceKind::Local);
    }

    #[tokio::test]
    async fn test_best_provider_unsupported_language_errors() {
        let options = WorkspaceOptions {
            base_url: Some("http://127.0.0.1:1".to_string()),
            ..Default::default()
        };
        // Supported only by the remote backend, which is down.
        let result = best_provider_for_language("kotlin", &options).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_list_available_providers_reports_all_kinds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/runtimes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let options = WorkspaceOptions {
            base_url: Some(server.uri()),
            ..Default::default()
        };
        let statuses = list_available_providers(&options).await;
        assert_eq!(statuses.len(), 3);

        let local = statuses
            .iter()
            .find(|s| s.kind == WorkspaceKind::Local)
            .unwrap();
        assert!(local.available);
        assert!(local.supported_languages.contains(&"python"));

        let remote = statuses
            .iter()
            .find(|s| s.kind == WorkspaceKind::Remote)
            .unwrap();
        assert!(remote.available);
    }
}
