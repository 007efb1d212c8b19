//! Configuration system for the `Taskboard` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskboard/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use taskboard_proto::filter::TaskFilter;
use taskboard_proto::task::{TaskStatus, UserId, WorkspaceId};

use crate::transport::ws::DEFAULT_REQUEST_TIMEOUT;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// The server URL is not a usable WebSocket URL.
    #[error("invalid server url {url}: {reason}")]
    InvalidServerUrl {
        /// The rejected value.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A setting required for the requested command is absent.
    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerFileConfig,
    session: SessionFileConfig,
}

/// `[server]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    url: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// `[session]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SessionFileConfig {
    user: Option<String>,
    workspace: Option<String>,
    project: Option<String>,
    assignee: Option<String>,
}

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Ordered task board client")]
pub struct CliArgs {
    /// What to do.
    #[command(subcommand)]
    pub command: Command,

    /// WebSocket URL of the task server.
    #[arg(long, env = "BOARD_SERVER_URL")]
    pub server_url: Option<String>,

    /// User identity to act as.
    #[arg(long, env = "BOARD_USER")]
    pub user: Option<String>,

    /// Workspace whose board to show.
    #[arg(long, env = "BOARD_WORKSPACE")]
    pub workspace: Option<String>,

    /// Only show tasks of this project.
    #[arg(long)]
    pub project: Option<String>,

    /// Only show tasks assigned to this member.
    #[arg(long)]
    pub assignee: Option<String>,

    /// Seconds a request may wait for its reply.
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,

    /// Path to config file (default: `~/.config/taskboard/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn", env = "BOARD_LOG")]
    pub log_level: String,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    pub json: bool,
}

/// Client subcommands.
#[derive(clap::Subcommand, Debug, Default, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the board, one column per status.
    #[default]
    Show,
    /// Move a task, as if dragged, and persist the result.
    Move {
        /// Column the task is in.
        from: TaskStatus,
        /// Zero-based index of the task in that column.
        from_index: usize,
        /// Column to drop the task into.
        to: TaskStatus,
        /// Zero-based index to drop the task at.
        to_index: usize,
    },
    /// Create a task at the end of a column.
    Create {
        /// Task name.
        name: String,
        /// Initial column.
        #[arg(long, default_value = "backlog")]
        status: TaskStatus,
        /// Project to file the task under (defaults to the session project).
        #[arg(long)]
        project: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Task server WebSocket URL.
    pub server_url: String,
    /// Identity to act as.
    pub user: Option<String>,
    /// Workspace to show.
    pub workspace: Option<String>,
    /// Project filter.
    pub project: Option<String>,
    /// Assignee filter.
    pub assignee: Option<String>,
    /// How long a request waits for its reply.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:9100/ws".to_string(),
            user: None,
            workspace: None,
            project: None,
            assignee: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed, or the resolved server URL is not a `ws`/`wss` URL.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        let config = Self::resolve(cli, &file);
        validate_server_url(&config.server_url)?;
        Ok(config)
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            server_url: cli
                .server_url
                .clone()
                .or_else(|| file.server.url.clone())
                .unwrap_or(defaults.server_url),
            user: cli.user.clone().or_else(|| file.session.user.clone()),
            workspace: cli
                .workspace
                .clone()
                .or_else(|| file.session.workspace.clone()),
            project: cli
                .project
                .clone()
                .or_else(|| file.session.project.clone()),
            assignee: cli
                .assignee
                .clone()
                .or_else(|| file.session.assignee.clone()),
            request_timeout: cli
                .request_timeout_secs
                .or(file.server.request_timeout_secs)
                .map_or(defaults.request_timeout, Duration::from_secs),
        }
    }

    /// The identity to open a session with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if no user is configured.
    pub fn user_id(&self) -> Result<UserId, ConfigError> {
        self.user
            .as_deref()
            .map(UserId::new)
            .ok_or(ConfigError::Missing("user"))
    }

    /// The task filter describing this board view.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] if no workspace is configured.
    pub fn task_filter(&self) -> Result<TaskFilter, ConfigError> {
        let workspace = self
            .workspace
            .as_deref()
            .ok_or(ConfigError::Missing("workspace"))?;
        let mut filter = TaskFilter::workspace(WorkspaceId::new(workspace));
        if let Some(project) = &self.project {
            filter = filter.with_project(project.clone());
        }
        if let Some(assignee) = &self.assignee {
            filter = filter.with_assignee(assignee.clone());
        }
        Ok(filter)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Checks that `raw` is a `ws://` or `wss://` URL with a host.
fn validate_server_url(raw: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidServerUrl {
        url: raw.to_string(),
        reason,
    };
    let parsed = url::Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "ws" | "wss") {
        return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(())
}

/// Load and parse a TOML config file.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("taskboard").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
