//! CLI definitions using clap derive API

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// serverup - language server environment and binary manager
#[derive(Parser, Debug)]
#[command(
    name = "serverup",
    author,
    version,
    about = "Resolves the language server environment and keeps its binary current",
    after_help = "EXAMPLES:\n    \
                  serverup server-path\n    \
                  serverup server-path --yes\n    \
                  serverup env -w ./my-project\n    \
                  serverup config import settings.json"
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Database file (defaults to the per-user data directory)
    #[arg(long, global = true, env = "SERVERUP_DATABASE", value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Directory downloaded servers are installed into
    #[arg(long, global = true, env = "SERVERUP_BIN_DIR", value_name = "DIR")]
    pub bin_dir: Option<PathBuf>,

    /// Workspace root; repeat for multi-root workspaces, the first one wins
    #[arg(long = "workspace", short = 'w', global = true, value_name = "DIR")]
    pub workspaces: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the resolved server environment as KEY=VALUE lines
    Env(EnvArgs),

    /// Print the path of a usable language server, installing it if needed
    ServerPath(ServerPathArgs),

    /// Show the installed binary and when it was last checked
    Status,

    /// Show or replace stored settings
    Config(ConfigArgs),
}

/// Arguments for the env command
#[derive(Parser, Debug)]
pub struct EnvArgs {
    /// JSON object of variables to resolve instead of the stored `extra_env`
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,
}

/// Arguments for the server-path command
#[derive(Parser, Debug)]
pub struct ServerPathArgs {
    /// Download without asking
    #[arg(long, short = 'y')]
    pub yes: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print stored settings as JSON
    Show,

    /// Replace stored settings with a JSON file
    Import {
        /// Settings file
        file: PathBuf,
    },
}
