use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Local gateway translating Anthropic, Chat-Completions and Responses
/// traffic onto a Copilot-compatible upstream.
#[derive(Debug, Parser)]
#[command(name = "copilot-gateway", version, about)]
pub struct Args {
    /// Path to the gateway.toml configuration file.
    #[arg(short, long, default_value = "gateway.toml")]
    pub config: PathBuf,

    /// Address to listen on, overriding the configuration.
    #[arg(short, long)]
    pub listen: Option<SocketAddr>,

    /// Log level filter (error, warn, info, debug, trace).
    #[arg(long, default_value = "info", env = "GATEWAY_LOG")]
    pub log_level: String,
}
