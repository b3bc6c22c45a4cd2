//! Workspace module - Pluggable execution backends
//!
//! Provides three workspace backends behind one contract:
//! - Local: direct host execution via the OS process API (no isolation)
//! - Docker: a reusable long-lived container per workspace
//! - Remote: a Piston-compatible HTTP execution service
//!
//! Backends are constructed through the [`factory`] functions, either by
//! explicit kind or by capability-aware selection for a target language.

pub mod demux;
pub mod factory;
pub mod languages;
pub mod remote;

mod docker;
mod local;
mod provider;

pub use docker::DockerWorkspace;
pub use factory::{
    best_provider_for_language, get_enhanced_provider, get_workspace_provider,
    list_available_providers, ProviderStatus, WorkspaceOptions,
};
pub use languages::{
    is_supported, language_info, supported_ids, LanguageInfo, PackageManager,
    SUPPORTED_LANGUAGES,
};
pub use local::LocalWorkspace;
pub use provider::{
    CodeOptions, EnhancedWorkspace, ExecuteOptions, ExecuteResult, WorkspaceProvider,
    DEFAULT_MEMORY_LIMIT_MB, DEFAULT_TIMEOUT_SECS, TIMEOUT_EXIT_CODE,
};
pub use remote::RemoteWorkspace;
