//! Server configuration from command line and environment.

use std::net::SocketAddr;

use clap::Parser;

/// Collaborative coding server.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "CODEBUDDY_BIND", default_value = "127.0.0.1:8080")]
    pub bind: SocketAddr,

    /// Default log filter, used when RUST_LOG is unset
    #[arg(long, env = "CODEBUDDY_LOG", default_value = "info")]
    pub log_level: String,
}
