//! Command-line interface for rqflow.

mod commands;

use clap::{Parser, Subcommand};

/// rqflow - purchase requisition workflow service
#[derive(Parser)]
#[command(name = "rqflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the web API together with the archival scheduler
    #[command(alias = "daemon")]
    Serve,

    /// Archive and delete old finished requisitions once, then exit
    Archive,

    /// Create a database user; the password is read from stdin
    CreateUser {
        username: String,
        /// Solicitante, Almacen, Compras, Admin or Superadmin
        #[arg(long, default_value = "Solicitante")]
        role: String,
        #[arg(long)]
        email: Option<String>,
        /// Department name, created if it does not exist yet
        #[arg(long)]
        department: Option<String>,
    },

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
