//! Service redeployment over a container engine
//!
//! Resolves a compose service to its container, captures its configuration,
//! tears it down, refreshes its image, and recreates it with the same
//! configuration on the same networks.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod error;
pub mod image;
pub mod locks;
pub mod orchestrator;
pub mod recreate;
pub mod resolver;
pub mod snapshot;
mod stop;
pub mod teardown;

pub use error::DeployError;
pub use image::ImageRefresher;
pub use locks::{LabelGuard, LabelLocks};
pub use orchestrator::Redeployer;
pub use recreate::Recreator;
pub use resolver::ServiceResolver;
pub use snapshot::{SnapshotExtractor, build_snapshot};
pub use teardown::Teardown;

// Re-export commonly used types
pub use relaunch_core::{DeployEvent, DeployStep, RedeploymentResult, StopOutcome};
