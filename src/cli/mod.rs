//! CLI module for the admission gateway

pub mod serve;

use clap::{Parser, Subcommand};

/// Admission gateway - credential, entitlement and rate-limit enforcement in
/// front of protected API handlers
#[derive(Parser)]
#[command(name = "admission-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve,
}
