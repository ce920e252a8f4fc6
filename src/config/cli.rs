use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "signup-wizard")]
#[command(about = "Drive the signup wizard from the command line")]
pub struct CliConfig {
    /// Path to a TOML configuration file; built-in defaults are used when absent
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// How each rendered view is printed
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Serve rates from `rates.fixed` instead of calling the rate endpoint
    #[arg(long)]
    pub offline: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}
