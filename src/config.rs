//! Configuration management for Runbox
//!
//! Loads configuration from environment variables (a `.env` file is honored
//! when present).

use crate::{Error, Result};
use serde::Deserialize;

/// Workspace backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceKind {
    /// Run directly on the host via the OS process API (no isolation)
    Local,
    /// Run inside a long-lived Docker container
    Docker,
    /// Run on a remote Piston-compatible execution service (recommended)
    #[default]
    Remote,
}

impl std::str::FromStr for WorkspaceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "local" => Ok(WorkspaceKind::Local),
            "docker" | "container" => Ok(WorkspaceKind::Docker),
            "remote" | "piston" => Ok(WorkspaceKind::Remote),
            _ => Err(Error::Config(format!(
                "Invalid workspace backend: {}. Valid options: local, docker, remote",
                s
            ))),
        }
    }
}

impl std::fmt::Display for WorkspaceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkspaceKind::Local => write!(f, "local"),
            WorkspaceKind::Docker => write!(f, "docker"),
            WorkspaceKind::Remote => write!(f, "remote"),
        }
    }
}

/// Docker/container configuration
#[derive(Debug, Clone)]
pub struct DockerConfig {
    /// Docker image to run workspaces in
    pub image: String,
    /// Network mode (none, bridge, host)
    pub network: String,
    /// Memory limit in megabytes
    pub memory_limit_mb: i64,
    /// CPU limit (fractional cores)
    pub cpu_limit: f64,
}

/// Remote execution service configuration
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the Piston-compatible API
    pub base_url: String,
}

/// Workspace/execution configuration
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Backend kind
    pub kind: WorkspaceKind,
    /// Default per-execution timeout in seconds
    pub timeout_secs: u64,
    /// Default per-execution memory limit in megabytes
    pub memory_limit_mb: u64,
    /// Container settings
    pub docker: DockerConfig,
    /// Remote service settings
    pub remote: RemoteConfig,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level filter
    pub level: String,
    /// Log format (pretty, json)
    pub format: String,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace/execution settings
    pub workspace: WorkspaceConfig,
    /// Logging settings
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Ok(Config {
            workspace: WorkspaceConfig {
                kind: std::env::var("WORKSPACE_BACKEND")
                    .unwrap_or_else(|_| "remote".to_string())
                    .parse()?,
                timeout_secs: std::env::var("EXECUTE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
                memory_limit_mb: std::env::var("EXECUTE_MEMORY_LIMIT_MB")
                    .unwrap_or_else(|_| "256".to_string())
                    .parse()
                    .unwrap_or(256),
                docker: DockerConfig {
                    image: std::env::var("DOCKER_IMAGE")
                        .unwrap_or_else(|_| "python:3.11-slim".to_string()),
                    network: std::env::var("DOCKER_NETWORK")
                        .unwrap_or_else(|_| "none".to_string()),
                    memory_limit_mb: std::env::var("DOCKER_MEMORY_LIMIT_MB")
                        .unwrap_or_else(|_| "512".to_string())
                        .parse()
                        .unwrap_or(512),
                    cpu_limit: std::env::var("DOCKER_CPU_LIMIT")
                        .unwrap_or_else(|_| "1.0".to_string())
                        .parse()
                        .unwrap_or(1.0),
                },
                remote: RemoteConfig {
                    base_url: std::env::var("PISTON_API_URL").unwrap_or_else(|_| {
                        crate::workspace::remote::DEFAULT_BASE_URL.to_string()
                    }),
                },
            },
            log: LogConfig {
                level: std::env::var("RUST_LOG")
                    .unwrap_or_else(|_| "info,runbox=debug".to_string()),
                format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            },
        })
    }

    /// Create a minimal default config for testing or one-off calls
    pub fn minimal() -> Self {
        Config {
            workspace: WorkspaceConfig {
                kind: WorkspaceKind::Remote,
                timeout_secs: 30,
                memory_limit_mb: 256,
                docker: DockerConfig {
                    image: "python:3.11-slim".to_string(),
                    network: "none".to_string(),
                    memory_limit_mb: 512,
                    cpu_limit: 1.0,
                },
                remote: RemoteConfig {
                    base_url: crate::workspace::remote::DEFAULT_BASE_URL.to_string(),
                },
            },
            log: LogConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    /// Validate that the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.workspace.timeout_secs == 0 {
            return Err(Error::Config(
                "EXECUTE_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        if self.workspace.memory_limit_mb == 0 {
            return Err(Error::Config(
                "EXECUTE_MEMORY_LIMIT_MB must be greater than zero".to_string(),
            ));
        }
        if self.workspace.kind == WorkspaceKind::Docker && self.workspace.docker.image.is_empty() {
            return Err(Error::Config("DOCKER_IMAGE is required".to_string()));
        }
        url::Url::parse(&self.workspace.remote.base_url)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_kind_parsing() {
        assert_eq!("local".parse::<WorkspaceKind>().unwrap(), WorkspaceKind::Local);
        assert_eq!(
            "docker".parse::<WorkspaceKind>().unwrap(),
            WorkspaceKind::Docker
        );
        assert_eq!(
            "container".parse::<WorkspaceKind>().unwrap(),
            WorkspaceKind::Docker
        );
        assert_eq!(
            "remote".parse::<WorkspaceKind>().unwrap(),
            WorkspaceKind::Remote
        );
        assert_eq!(
            "piston".parse::<WorkspaceKind>().unwrap(),
            WorkspaceKind::Remote
        );
        assert!("invalid".parse::<WorkspaceKind>().is_err());
    }

    #[test]
    fn test_minimal_config_validates() {
        let config = Config::minimal();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::minimal();
        config.workspace.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_remote_url_rejected() {
        let mut config = Config::minimal();
        config.workspace.remote.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }
}
