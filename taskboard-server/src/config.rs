//! Configuration for the `Taskboard` server.
//!
//! Settings are taken from, in order of precedence: CLI arguments,
//! environment variables (through clap's `env` attribute), the `[server]`
//! section of a TOML file, and compiled defaults.
//!
//! Resolution fails early on a bind address that does not parse or a seed
//! file that does not exist, so the server never starts half-configured.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Address used when nothing else is configured.
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9100";

/// Errors that can occur when loading server configuration.
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

    /// The bind address is not `host:port`.
    #[error("invalid bind address {addr:?}: {source}")]
    InvalidBindAddr {
        /// The rejected value.
        addr: String,
        /// Parse failure.
        source: std::net::AddrParseError,
    },

    /// The configured seed file does not exist.
    #[error("seed file {0} does not exist")]
    SeedNotFound(PathBuf),
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerConfigFile {
    server: ServerFileConfig,
}

/// `[server]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    /// Relative paths are taken from the config file's directory.
    seed_file: Option<PathBuf>,
}

/// CLI arguments for the board server.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Taskboard server")]
pub struct ServerCliArgs {
    /// Address to bind the server to.
    #[arg(short, long, env = "BOARD_SERVER_ADDR")]
    pub bind: Option<String>,

    /// Path to config file (default: `~/.config/taskboard-server/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// TOML file with initial members and tasks.
    #[arg(short, long, env = "BOARD_SEED")]
    pub seed: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "BOARD_SERVER_LOG")]
    pub log_level: String,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
    /// Seed file loaded at startup, if any. Known to exist at load time.
    pub seed_file: Option<PathBuf>,
    /// Log level filter string.
    pub log_level: String,
}

impl ServerConfig {
    /// Loads configuration from the CLI, the environment and a TOML file.
    ///
    /// An explicit `--config` that cannot be read is an error; a missing
    /// file at the default location is treated as empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the config file cannot be read or parsed,
    /// the bind address is malformed, or the seed file is missing.
    pub fn load(cli: &ServerCliArgs) -> Result<Self, ConfigError> {
        let (file, base_dir) = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, file, base_dir.as_deref())
    }

    fn resolve(
        cli: &ServerCliArgs,
        file: ServerConfigFile,
        base_dir: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let addr = cli
            .bind
            .clone()
            .or(file.server.bind_addr)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = addr
            .parse()
            .map_err(|source| ConfigError::InvalidBindAddr { addr, source })?;

        let from_file = file.server.seed_file.map(|path| match base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path,
        });
        let seed_file = cli.seed.clone().or(from_file);
        if let Some(path) = &seed_file
            && !path.is_file()
        {
            return Err(ConfigError::SeedNotFound(path.clone()));
        }

        Ok(Self {
            bind_addr,
            seed_file,
            log_level: cli.log_level.clone(),
        })
    }
}

/// Reads the config file and returns it with the directory it lives in.
fn load_config_file(
    explicit_path: Option<&Path>,
) -> Result<(ServerConfigFile, Option<PathBuf>), ConfigError> {
    let base_dir = |p: &Path| p.parent().map(Path::to_path_buf);

    if let Some(path) = explicit_path {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        return Ok((toml::from_str(&contents)?, base_dir(path)));
    }

    let Some(config_dir) = dirs::config_dir() else {
        return Ok((ServerConfigFile::default(), None));
    };
    let path = config_dir.join("taskboard-server").join("config.toml");
    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok((toml::from_str(&contents)?, base_dir(&path))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Ok((ServerConfigFile::default(), None))
        }
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
