use std::path::PathBuf;

use cemes_core::api::ListFilter;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "cemes", version, about = "Admin client for the CEMES microcredit backend")]
pub struct Cli {
    /// Keep the session in memory only (nothing is written to disk or the keychain)
    #[arg(long, global = true)]
    pub ephemeral: bool,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the session
    Login {
        #[arg(long)]
        email: Option<String>,
        /// Location to open once logged in
        #[arg(long, value_name = "PATH")]
        next: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show who is logged in
    Status,
    /// Open a view by path, e.g. `/loans`
    Visit { path: String },
    /// Record counts and totals across loans, customers and payments
    Summary,
    /// Manage loans
    Loans {
        #[command(subcommand)]
        action: ResourceAction,
    },
    /// Manage customers
    Customers {
        #[command(subcommand)]
        action: ResourceAction,
    },
    /// Manage payments
    Payments {
        #[command(subcommand)]
        action: ResourceAction,
    },
    /// Manage admin users
    Admins {
        #[command(subcommand)]
        action: ResourceAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ResourceAction {
    /// List records, optionally narrowed down
    List(ListArgs),
    Get {
        id: i64,
    },
    /// Create from a JSON object (or `@file.json`)
    Create {
        json: String,
    },
    /// Replace a record with a JSON object (or `@file.json`)
    Update {
        id: i64,
        json: String,
    },
    Delete {
        id: i64,
    },
}

/// Case-insensitive filters for `list`
#[derive(Debug, Default, Args)]
pub struct ListArgs {
    /// Keep records whose status contains this text
    #[arg(long)]
    pub status: Option<String>,
    /// Keep records whose branch contains this text
    #[arg(long)]
    pub branch: Option<String>,
    /// Keep records with any field containing this text
    #[arg(long, short)]
    pub search: Option<String>,
}

impl From<ListArgs> for ListFilter {
    fn from(args: ListArgs) -> Self {
        Self {
            status: args.status,
            branch: args.branch,
            search: args.search,
        }
    }
}
