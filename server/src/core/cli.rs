use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::config::TrustMode;
use super::constants::{
    ENV_CONFIG, ENV_DIRECTORY_SEARCH_AUTH, ENV_HOST, ENV_PORT, ENV_SESSION_SECRET,
    ENV_SESSION_TTL_DAYS, ENV_TRUST_MODE,
};

#[derive(Parser)]
#[command(name = "gatehouse")]
#[command(version, about = "Login gateway with proxy, directory and local authentication", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Authentication trust mode (disabled, proxy, directory, local)
    #[arg(long, global = true, env = ENV_TRUST_MODE, value_parser = parse_trust_mode)]
    pub trust_mode: Option<TrustMode>,

    /// Hex-encoded session signing secret
    #[arg(long, global = true, env = ENV_SESSION_SECRET, hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Session lifetime in days
    #[arg(long, global = true, env = ENV_SESSION_TTL_DAYS)]
    pub session_ttl_days: Option<u32>,

    /// Password of the directory search principal
    #[arg(long, global = true, env = ENV_DIRECTORY_SEARCH_AUTH, hide_env_values = true)]
    pub directory_search_auth: Option<String>,
}

/// Parse trust mode from CLI/env string
fn parse_trust_mode(s: &str) -> Result<TrustMode, String> {
    match s.to_lowercase().as_str() {
        "disabled" | "off" | "none" => Ok(TrustMode::Disabled),
        "proxy" => Ok(TrustMode::Proxy),
        "directory" | "ldap" => Ok(TrustMode::Directory),
        "local" => Ok(TrustMode::Local),
        _ => Err(format!(
            "Invalid trust mode '{}'. Valid options: disabled, proxy, directory, local",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
    /// Local account administration
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum UserCommands {
    /// Create a local account that can sign in with a password
    Add {
        /// Login name
        #[arg(long)]
        login: String,

        /// Email address
        #[arg(long)]
        email: Option<String>,

        /// Display name
        #[arg(long)]
        realname: Option<String>,

        /// Password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,

        /// Grant administrator rights
        #[arg(long)]
        admin: bool,
    },
    /// Set the password of an existing account
    Passwd {
        /// Login name
        #[arg(long)]
        login: String,

        /// New password (read from stdin when omitted)
        #[arg(long)]
        password: Option<String>,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub trust_mode: Option<TrustMode>,
    pub session_secret: Option<String>,
    pub session_ttl_days: Option<u32>,
    pub directory_search_auth: Option<String>,
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            config: cli.config,
            trust_mode: cli.trust_mode,
            session_secret: cli.session_secret,
            session_ttl_days: cli.session_ttl_days,
            directory_search_auth: cli.directory_search_auth,
        }
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let mut cli = Cli::parse();
    let command = cli.command.take();
    (CliConfig::from(cli), command)
}
