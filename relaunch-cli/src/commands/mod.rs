use anyhow::{Context, Result};
use relaunch_core::{RelaunchConfig, ServiceLabel};
use relaunch_deploy::Redeployer;
use relaunch_engine::DockerEngine;
use std::sync::Arc;

use crate::cli::{Cli, Commands};

pub mod list;
pub mod restart;
pub mod stop;

/// Dispatch command to appropriate handler
///
/// Arguments are validated before any engine connection is made.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = cli.engine.config();
    config.validate()?;

    match cli.command {
        Commands::Restart { service } => {
            let service = ServiceLabel::new(service)?;
            restart::execute(&redeployer(&config)?, &service).await
        }

        Commands::Stop { service } => {
            let service = ServiceLabel::new(service)?;
            stop::execute(&redeployer(&config)?, &service).await
        }

        Commands::List => list::execute(&redeployer(&config)?).await,
    }
}

fn redeployer(config: &RelaunchConfig) -> Result<Redeployer> {
    let engine = DockerEngine::connect(config).with_context(|| {
        format!(
            "Failed to connect to engine at {}",
            config.socket_path.display()
        )
    })?;

    Ok(Redeployer::new(Arc::new(engine), config))
}
