//! Command-line argument parsing

use crate::registry::scheme::RequestScheme;
use crate::store::StoreBackend;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

const EXAMPLES: &str = "\
Examples:
  # Interactive login
  registry-login login registry.example.com

  # Non-interactive login for scripts
  echo \"$TOKEN\" | registry-login login ghcr.io -u octocat --password-stdin

  # Local registry over plain HTTP
  registry-login login localhost:5000 -u admin

  # Forget stored credentials
  registry-login logout registry.example.com";

#[derive(Parser, Debug)]
#[command(name = "registry-login")]
#[command(about = "Verify container registry credentials and store them securely")]
#[command(version, after_help = EXAMPLES)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Verbose output
    #[arg(long = "verbose", short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Quiet mode
    #[arg(
        long = "quiet",
        short = 'q',
        global = true,
        conflicts_with = "verbose",
        help = "Only print errors"
    )]
    pub quiet: bool,

    #[arg(long = "store", global = true, value_enum, help = "Where credentials are stored")]
    pub store: Option<StoreBackend>,

    #[arg(
        long = "credentials-file",
        global = true,
        help = "Credentials file used by the file store"
    )]
    pub credentials_file: Option<PathBuf>,

    #[arg(
        long = "keychain-id",
        global = true,
        help = "Keychain service name credentials are filed under"
    )]
    pub keychain_id: Option<String>,

    #[arg(
        long = "install-root",
        global = true,
        help = "Installation prefix searched for trusted plugins"
    )]
    pub install_root: Option<PathBuf>,

    /// Retry attempts for the registry ping
    #[arg(
        long = "retry",
        global = true,
        help = "Maximum ping attempts on server errors (default: 10)"
    )]
    pub retry: Option<u32>,

    #[arg(
        long = "retry-interval-ms",
        global = true,
        help = "Delay between ping attempts in milliseconds (default: 300)"
    )]
    pub retry_interval_ms: Option<u64>,

    /// Timeout in seconds for network operations
    #[arg(
        long = "timeout",
        short = 't',
        global = true,
        help = "Timeout for each registry request in seconds (default: 30)"
    )]
    pub timeout: Option<u64>,

    /// Configuration file path
    #[arg(long = "config", global = true, help = "Path to a JSON configuration file")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in to a registry and save the credentials
    Login {
        /// Registry server, e.g. registry.example.com or localhost:5000
        server: String,

        #[arg(long = "username", short = 'u', help = "Registry username")]
        username: Option<String>,

        #[arg(long = "password-stdin", help = "Read the password from standard input")]
        password_stdin: bool,

        #[arg(
            long = "scheme",
            value_enum,
            default_value_t = RequestScheme::Auto,
            help = "Registry scheme; auto uses http only for local and private hosts"
        )]
        scheme: RequestScheme,
    },
    /// Remove saved credentials for a registry
    Logout {
        /// Registry server
        server: String,
    },
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }
}
