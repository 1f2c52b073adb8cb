//! # Manhaj CLI Module
//!
//! This module implements the CLI interface for Manhaj.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show catalog counters
//! - `init` - Create a new database and apply the bundled seed
//! - `seed` - Apply a seed manifest (bundled or `--file`)
//! - `tree` - Print the taxonomy outline
//! - `path` - Print the breadcrumb of a node
//! - `user add|list|check` - Manage accounts

mod commands;

use crate::config::{Backend, Settings};
use clap::{Parser, Subcommand};
use manhaj_core::{ManhajError, Role};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Manhaj - Arabic educational content platform
///
/// Serves a moderated content graph: topics, articles and media arranged in a
/// taxonomy and tagged against national curricula.
#[derive(Parser, Debug)]
#[command(name = "manhaj")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the database file (overrides config)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend (overrides config)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

    /// TOML configuration file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Apply the bundled seed before serving
        #[arg(long)]
        seed: bool,
    },

    /// Show catalog counters
    Status,

    /// Create a new database and apply the bundled seed
    Init {
        /// Replace an existing database file
        #[arg(short, long)]
        force: bool,
    },

    /// Apply a seed manifest (idempotent)
    Seed {
        /// TOML manifest; the bundled manifest when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Print the taxonomy outline
    Tree {
        /// Start from this node instead of every root
        #[arg(short, long)]
        root: Option<String>,
    },

    /// Print the breadcrumb from the root to a node
    Path {
        /// Node id
        id: String,
    },

    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Register a user
    Add {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// admin or contributor
        #[arg(short, long, default_value = "contributor")]
        role: Role,
    },

    /// List users with their node counts
    List,

    /// Check an email/password pair against the stored hash
    Check {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
}

impl Cli {
    /// Effective settings: config file and environment, then the flags.
    pub fn settings(&self) -> Result<Settings, ManhajError> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(database) = &self.database {
            settings.database = database.clone();
        }
        if let Some(backend) = self.backend {
            settings.backend = backend;
        }
        Ok(settings)
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), ManhajError> {
    let mut settings = cli.settings()?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port, seed }) => {
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }
            cmd_server(settings, seed).await
        }
        Some(Commands::Status) | None => cmd_status(&settings, json_mode),
        Some(Commands::Init { force }) => cmd_init(&settings, force, json_mode),
        Some(Commands::Seed { file }) => cmd_seed(&settings, file.as_deref(), json_mode),
        Some(Commands::Tree { root }) => cmd_tree(&settings, root.as_deref(), json_mode),
        Some(Commands::Path { id }) => cmd_path(&settings, &id, json_mode),
        Some(Commands::User { action }) => match action {
            UserCommand::Add {
                name,
                email,
                password,
                role,
            } => cmd_user_add(&settings, name, email, password, role, json_mode),
            UserCommand::List => cmd_user_list(&settings, json_mode),
            UserCommand::Check { email, password } => {
                cmd_user_check(&settings, &email, &password, json_mode)
            }
        },
    }
}
