//! Language/runtime registry
//!
//! Static table mapping canonical language names to the remote backend's
//! runtime identifiers, pinned versions, file extensions, and package
//! managers. Loaded once, keyed by canonical id, unique.

use crate::{Error, Result};

/// A supported language and its backend runtime mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageInfo {
    /// Canonical id (lowercase)
    pub id: &'static str,
    /// Human-readable name
    pub name: &'static str,
    /// Accepted aliases
    pub aliases: &'static [&'static str],
    /// Source file extension, with leading dot
    pub extension: &'static str,
    /// Runtime identifier on the remote execution service
    pub runtime: &'static str,
    /// Pinned runtime version on the remote execution service
    pub runtime_version: &'static str,
    /// Package manager, for languages that have one
    pub package_manager: Option<PackageManager>,
}

/// All supported languages
pub const SUPPORTED_LANGUAGES: &[LanguageInfo] = &[
    LanguageInfo { id: "python", name: "Python", aliases: &["py", "python3"], extension: ".py", runtime: "python", runtime_version: "3.10.0", package_manager: Some(PackageManager::Pip) },
    LanguageInfo { id: "javascript", name: "JavaScript", aliases: &["js", "node", "nodejs"], extension: ".js", runtime: "javascript", runtime_version: "18.15.0", package_manager: Some(PackageManager::Npm) },
    LanguageInfo { id: "typescript", name: "TypeScript", aliases: &["ts"], extension: ".ts", runtime: "typescript", runtime_version: "5.0.3", package_manager: Some(PackageManager::Npm) },
    LanguageInfo { id: "java", name: "Java", aliases: &[], extension: ".java", runtime: "java", runtime_version: "15.0.2", package_manager: None },
    LanguageInfo { id: "cpp", name: "C++", aliases: &["c++", "cxx"], extension: ".cpp", runtime: "c++", runtime_version: "10.2.0", package_manager: None },
    LanguageInfo { id: "c", name: "C", aliases: &[], extension: ".c", runtime: "c", runtime_version: "10.2.0", package_manager: None },
    LanguageInfo { id: "go", name: "Go", aliases: &["golang"], extension: ".go", runtime: "go", runtime_version: "1.16.2", package_manager: Some(PackageManager::Go) },
    LanguageInfo { id: "rust", name: "Rust", aliases: &["rs"], extension: ".rs", runtime: "rust", runtime_version: "1.68.2", package_manager: Some(PackageManager::Cargo) },
    LanguageInfo { id: "ruby", name: "Ruby", aliases: &["rb"], extension: ".rb", runtime: "ruby", runtime_version: "3.0.1", package_manager: Some(PackageManager::Gem) },
    LanguageInfo { id: "php", name: "PHP", aliases: &[], extension: ".php", runtime: "php", runtime_version: "8.2.3", package_manager: Some(PackageManager::Composer) },
    LanguageInfo { id: "kotlin", name: "Kotlin", aliases: &["kt"], extension: ".kt", runtime: "kotlin", runtime_version: "1.8.20", package_manager: None },
    LanguageInfo { id: "swift", name: "Swift", aliases: &[], extension: ".swift", runtime: "swift", runtime_version: "5.3.3", package_manager: None },
    LanguageInfo { id: "scala", name: "Scala", aliases: &[], extension: ".scala", runtime: "scala", runtime_version: "3.2.2", package_manager: None },
    LanguageInfo { id: "haskell", name: "Haskell", aliases: &["hs"], extension: ".hs", runtime: "haskell", runtime_version: "9.0.1", package_manager: None },
    LanguageInfo { id: "lua", name: "Lua", aliases: &[], extension: ".lua", runtime: "lua", runtime_version: "5.4.4", package_manager: None },
    LanguageInfo { id: "perl", name: "Perl", aliases: &["pl"], extension: ".pl", runtime: "perl", runtime_version: "5.36.0", package_manager: None },
    LanguageInfo { id: "r", name: "R", aliases: &["rlang"], extension: ".r", runtime: "rscript", runtime_version: "4.1.1", package_manager: None },
    LanguageInfo { id: "julia", name: "Julia", aliases: &["jl"], extension: ".jl", runtime: "julia", runtime_version: "1.8.5", package_manager: None },
    LanguageInfo { id: "elixir", name: "Elixir", aliases: &["ex"], extension: ".ex", runtime: "elixir", runtime_version: "1.11.3", package_manager: None },
    LanguageInfo { id: "erlang", name: "Erlang", aliases: &["erl"], extension: ".erl", runtime: "erlang", runtime_version: "23.0.0", package_manager: None },
    LanguageInfo { id: "clojure", name: "Clojure", aliases: &["clj"], extension: ".clj", runtime: "clojure", runtime_version: "1.10.3", package_manager: None },
    LanguageInfo { id: "dart", name: "Dart", aliases: &[], extension: ".dart", runtime: "dart", runtime_version: "2.19.6", package_manager: None },
    LanguageInfo { id: "bash", name: "Bash", aliases: &["sh", "shell"], extension: ".sh", runtime: "bash", runtime_version: "5.2.0", package_manager: None },
    LanguageInfo { id: "powershell", name: "PowerShell", aliases: &["ps1", "pwsh"], extension: ".ps1", runtime: "powershell", runtime_version: "7.1.4", package_manager: None },
    LanguageInfo { id: "sql", name: "SQL", aliases: &["sqlite"], extension: ".sql", runtime: "sqlite3", runtime_version: "3.36.0", package_manager: None },
    LanguageInfo { id: "csharp", name: "C#", aliases: &["cs", "c#"], extension: ".cs", runtime: "csharp.net", runtime_version: "5.0.201", package_manager: None },
    LanguageInfo { id: "fsharp", name: "F#", aliases: &["fs", "f#"], extension: ".fs", runtime: "fsharp.net", runtime_version: "5.0.201", package_manager: None },
];

/// Resolve a language by canonical id or alias (case-insensitive)
pub fn language_info(language: &str) -> Option<&'static LanguageInfo> {
    let normalized = language.trim().to_lowercase();
    SUPPORTED_LANGUAGES
        .iter()
        .find(|lang| lang.id == normalized || lang.aliases.contains(&normalized.as_str()))
}

/// Check whether a language is supported
pub fn is_supported(language: &str) -> bool {
    language_info(language).is_some()
}

/// Canonical ids of all supported languages
pub fn supported_ids() -> Vec<&'static str> {
    SUPPORTED_LANGUAGES.iter().map(|lang| lang.id).collect()
}

/// Package managers recognized by the workspace layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Pip,
    Npm,
    Yarn,
    Pnpm,
    Cargo,
    Go,
    Gem,
    Composer,
}

impl std::str::FromStr for PackageManager {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pip" => Ok(PackageManager::Pip),
            "npm" => Ok(PackageManager::Npm),
            "yarn" => Ok(PackageManager::Yarn),
            "pnpm" => Ok(PackageManager::Pnpm),
            "cargo" => Ok(PackageManager::Cargo),
            "go" => Ok(PackageManager::Go),
            "gem" => Ok(PackageManager::Gem),
            "composer" => Ok(PackageManager::Composer),
            _ => Err(Error::InvalidInput(format!(
                "Unsupported package manager: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PackageManager::Pip => "pip",
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Cargo => "cargo",
            PackageManager::Go => "go",
            PackageManager::Gem => "gem",
            PackageManager::Composer => "composer",
        };
        write!(f, "{}", name)
    }
}

impl PackageManager {
    /// Build the install command for a package, optionally pinned to a version
    pub fn install_command(&self, package: &str, version: Option<&str>) -> Vec<String> {
        let owned = |parts: &[&str]| parts.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        match (self, version) {
            (PackageManager::Pip, Some(v)) => owned(&["pip", "install", &format!("{}=={}", package, v)]),
            (PackageManager::Pip, None) => owned(&["pip", "install", package]),
            (PackageManager::Npm, Some(v)) => owned(&["npm", "install", &format!("{}@{}", package, v)]),
            (PackageManager::Npm, None) => owned(&["npm", "install", package]),
            (PackageManager::Yarn, Some(v)) => owned(&["yarn", "add", &format!("{}@{}", package, v)]),
            (PackageManager::Yarn, None) => owned(&["yarn", "add", package]),
            (PackageManager::Pnpm, Some(v)) => owned(&["pnpm", "add", &format!("{}@{}", package, v)]),
            (PackageManager::Pnpm, None) => owned(&["pnpm", "add", package]),
            (PackageManager::Cargo, Some(v)) => owned(&["cargo", "add", &format!("{}@{}", package, v)]),
            (PackageManager::Cargo, None) => owned(&["cargo", "add", package]),
            (PackageManager::Go, Some(v)) => owned(&["go", "get", &format!("{}@{}", package, v)]),
            (PackageManager::Go, None) => owned(&["go", "get", package]),
            (PackageManager::Gem, Some(v)) => owned(&["gem", "install", package, "-v", v]),
            (PackageManager::Gem, None) => owned(&["gem", "install", package]),
            (PackageManager::Composer, Some(v)) => owned(&["composer", "require", &format!("{}:{}", package, v)]),
            (PackageManager::Composer, None) => owned(&["composer", "require", package]),
        }
    }

    /// Build the command listing installed packages
    pub fn list_command(&self) -> Vec<String> {
        let parts: &[&str] = match self {
            PackageManager::Pip => &["pip", "list", "--format=freeze"],
            PackageManager::Npm => &["npm", "list", "--depth=0"],
            PackageManager::Yarn => &["yarn", "list", "--depth=0"],
            PackageManager::Pnpm => &["pnpm", "list", "--depth=0"],
            PackageManager::Cargo => &["cargo", "tree", "--depth=1"],
            PackageManager::Go => &["go", "list", "-m", "all"],
            PackageManager::Gem => &["gem", "list"],
            PackageManager::Composer => &["composer", "show"],
        };
        parts.iter().map(|s| s.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lookup_by_id_and_alias() {
        assert_eq!(language_info("python").unwrap().id, "python");
        assert_eq!(language_info("py").unwrap().id, "python");
        assert_eq!(language_info("PYTHON").unwrap().id, "python");
        assert_eq!(language_info(" js ").unwrap().id, "javascript");
        assert_eq!(language_info("golang").unwrap().id, "go");
        assert_eq!(language_info("c#").unwrap().id, "csharp");
        assert!(language_info("brainfuck").is_none());
    }

    #[test]
    fn test_ids_unique() {
        let mut seen = HashSet::new();
        for lang in SUPPORTED_LANGUAGES {
            assert!(seen.insert(lang.id), "duplicate id: {}", lang.id);
        }
    }

    #[test]
    fn test_every_language_has_runtime_mapping() {
        for lang in SUPPORTED_LANGUAGES {
            assert!(!lang.runtime.is_empty(), "{} missing runtime", lang.id);
            assert!(
                !lang.runtime_version.is_empty(),
                "{} missing runtime version",
                lang.id
            );
            assert!(
                lang.extension.starts_with('.'),
                "{} extension lacks dot",
                lang.id
            );
        }
    }

    #[test]
    fn test_remote_runtime_divergences() {
        // A few canonical ids map to differently-named remote runtimes.
        assert_eq!(language_info("r").unwrap().runtime, "rscript");
        assert_eq!(language_info("sql").unwrap().runtime, "sqlite3");
        assert_eq!(language_info("csharp").unwrap().runtime, "csharp.net");
        assert_eq!(language_info("cpp").unwrap().runtime, "c++");
    }

    #[test]
    fn test_package_manager_parsing() {
        assert_eq!("pip".parse::<PackageManager>().unwrap(), PackageManager::Pip);
        assert_eq!("NPM".parse::<PackageManager>().unwrap(), PackageManager::Npm);
        assert!("apt".parse::<PackageManager>().is_err());
    }

    #[test]
    fn test_install_commands() {
        assert_eq!(
            PackageManager::Pip.install_command("requests", Some("2.31.0")),
            vec!["pip", "install", "requests==2.31.0"]
        );
        assert_eq!(
            PackageManager::Npm.install_command("lodash", None),
            vec!["npm", "install", "lodash"]
        );
        assert_eq!(
            PackageManager::Gem.install_command("rails", Some("7.0.0")),
            vec!["gem", "install", "rails", "-v", "7.0.0"]
        );
    }
}
