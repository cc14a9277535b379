//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use relaunch_core::RelaunchConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "relaunch")]
#[command(about = "Redeploy compose services with a fresh image", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub engine: EngineArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Engine connection settings
#[derive(Args)]
pub struct EngineArgs {
    /// Engine control socket
    #[arg(
        long,
        global = true,
        env = "RELAUNCH_SOCKET",
        default_value = RelaunchConfig::DEFAULT_SOCKET
    )]
    pub socket: PathBuf,

    /// Label naming a container's service
    #[arg(long, global = true, default_value = RelaunchConfig::COMPOSE_SERVICE_LABEL)]
    pub label_key: String,

    /// Seconds to wait for a graceful stop before killing
    #[arg(long, global = true, default_value = "10")]
    pub grace_period: u32,

    /// Seconds before an engine request times out
    #[arg(long, global = true, default_value = "120")]
    pub timeout: u64,
}

impl EngineArgs {
    pub fn config(&self) -> RelaunchConfig {
        RelaunchConfig {
            socket_path: self.socket.clone(),
            service_label_key: self.label_key.clone(),
            stop_grace_period: self.grace_period,
            engine_timeout: self.timeout,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replace a service's container using a freshly pulled image
    Restart {
        /// Service name
        service: String,
    },

    /// Stop a service's container
    Stop {
        /// Service name
        service: String,
    },

    /// List containers that carry a service label
    List,
}
