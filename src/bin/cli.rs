//! Runbox CLI
//!
//! Command-line interface for running code and commands through the
//! workspace backends.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use runbox::config::{Config, WorkspaceKind};
use runbox::service::{self, CodeExecutionService};
use runbox::workspace::{
    languages, list_available_providers, CodeOptions, ExecuteOptions, WorkspaceOptions,
};
use runbox::VERSION;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "runbox",
    version = VERSION,
    about = "Runbox - sandboxed code execution workspaces",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute code in a given language
    Run {
        /// Programming language (id or alias, e.g. python, js)
        language: String,
        /// Code to execute (omit to read from --file)
        code: Option<String>,
        /// Read code from a file instead of the argument
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// Data piped to the program on stdin
        #[arg(long)]
        stdin: Option<String>,
        /// Run timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,
        /// Pin a backend instead of automatic selection (local, docker, remote)
        #[arg(short, long)]
        provider: Option<WorkspaceKind>,
    },

    /// Execute a shell command in the configured workspace
    Exec {
        /// Command to run
        command: String,
        /// Arguments for the command
        args: Vec<String>,
    },

    /// Show which providers are currently available
    Providers,

    /// List the supported languages
    Languages,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    config.validate()?;

    let filter = tracing_subscriber::EnvFilter::new(config.log.level.clone());
    if config.log.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let options = workspace_options(&config);

    match cli.command {
        Commands::Run {
            language,
            code,
            file,
            stdin,
            timeout,
            provider,
        } => {
            let code = match (code, file) {
                (Some(code), _) => code,
                (None, Some(path)) => std::fs::read_to_string(&path)?,
                (None, None) => anyhow::bail!("provide code inline or via --file"),
            };

            let mut code_options = CodeOptions::new();
            if let Some(stdin) = stdin {
                code_options = code_options.with_stdin(stdin);
            }
            code_options =
                code_options.with_timeout_secs(timeout.unwrap_or(config.workspace.timeout_secs));

            let result = match provider {
                Some(kind) => {
                    service::execute_code_with_provider(
                        &code,
                        &language,
                        kind,
                        &code_options,
                        &options,
                    )
                    .await
                }
                None => service::execute_code(&code, &language, &code_options, &options).await,
            };

            println!("{}", service::format_execution_result(&result));
            if !result.ok() {
                std::process::exit(result.exit_code.max(1));
            }
        }

        Commands::Exec { command, args } => {
            let mut svc = CodeExecutionService::new(config.workspace.kind, options);
            svc.initialize().await?;

            let exec_options = ExecuteOptions {
                timeout_secs: Some(config.workspace.timeout_secs),
                ..Default::default()
            };
            let result = svc.execute(&command, &args, Some(&exec_options)).await;
            svc.cleanup().await?;

            let result = result?;
            println!("{}", service::format_execution_result(&result));
            if !result.ok() {
                std::process::exit(result.exit_code.max(1));
            }
        }

        Commands::Providers => {
            info!("probing workspace providers");
            for status in list_available_providers(&options).await {
                let state = if status.available { "available" } else { "unavailable" };
                println!(
                    "{:<8} {:<24} {} ({} languages)",
                    status.kind,
                    status.name,
                    state,
                    status.supported_languages.len()
                );
            }
        }

        Commands::Languages => {
            for info in languages::SUPPORTED_LANGUAGES {
                let aliases = if info.aliases.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", info.aliases.join(", "))
                };
                println!("{:<12} {}{}", info.id, info.name, aliases);
            }
        }
    }

    Ok(())
}

fn workspace_options(config: &Config) -> WorkspaceOptions {
    WorkspaceOptions {
        image_name: Some(config.workspace.docker.image.clone()),
        base_url: Some(config.workspace.remote.base_url.clone()),
        network: Some(config.workspace.docker.network.clone()),
        memory_limit_mb: Some(config.workspace.docker.memory_limit_mb),
        cpu_limit: Some(config.workspace.docker.cpu_limit),
    }
}
