//! # Roster CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show row counts
//! - `init` - Initialize a new database
//! - `seed` - Bulk-load records from a JSON file
//! - `students` - List students
//! - `enroll` - Enroll a student into a section
//! - `withdraw` - Remove one enrollment
//! - `delete-student` - Delete a student and their enrollments

mod commands;

use crate::AppError;
use crate::config::{Backend, CliOverrides, RosterConfig};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Roster - student records server
///
/// Students, subjects and sections, with at most one section per subject
/// for every student.
#[derive(Parser, Debug)]
#[command(name = "roster")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file (default: ./roster.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the records database
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Storage backend
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<Backend>,

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
        /// Host to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Show row counts
    Status,

    /// Initialize a new empty database
    Init {
        /// Replace an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Bulk-load subjects, sections, students and enrollments
    Seed {
        /// Path to the JSON seed file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// List students
    Students,

    /// Enroll a student into a section
    Enroll {
        #[arg(short, long)]
        student: u64,

        #[arg(short = 'c', long)]
        section: u64,
    },

    /// Remove one enrollment
    Withdraw {
        #[arg(short, long)]
        student: u64,

        #[arg(short = 'c', long)]
        section: u64,
    },

    /// Delete a student together with their enrollments
    DeleteStudent {
        #[arg(long)]
        id: u64,
    },
}

impl Cli {
    /// The flags that take part in config layering.
    #[must_use]
    pub fn overrides(&self) -> CliOverrides {
        let (host, port) = match &self.command {
            Some(Commands::Server { host, port }) => (host.clone(), *port),
            _ => (None, None),
        };
        CliOverrides {
            database: self.database.clone(),
            backend: self.backend,
            host,
            port,
        }
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and resolved configuration.
pub async fn execute(cli: Cli, config: &RosterConfig) -> Result<(), AppError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { .. }) => cmd_server(config).await,
        Some(Commands::Status) | None => cmd_status(config, json_mode),
        Some(Commands::Init { force }) => cmd_init(config, force),
        Some(Commands::Seed { file }) => cmd_seed(config, json_mode, &file),
        Some(Commands::Students) => cmd_students(config, json_mode),
        Some(Commands::Enroll { student, section }) => {
            cmd_enroll(config, json_mode, student, section)
        }
        Some(Commands::Withdraw { student, section }) => {
            cmd_withdraw(config, json_mode, student, section)
        }
        Some(Commands::DeleteStudent { id }) => cmd_delete_student(config, json_mode, id),
    }
}
