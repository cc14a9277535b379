//! Relaunch Core - Foundation types, events, and utilities
//!
//! This crate provides the core abstractions used throughout Relaunch.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod events;
pub mod image;
pub mod outcome;
pub mod snapshot;
pub mod types;

pub use config::RelaunchConfig;
pub use error::{Error, FaultCategory, Result};
pub use events::{DeployEvent, DeployStep};
pub use image::ImageReference;
pub use outcome::{RedeployStatus, RedeploymentResult, StopOutcome};
pub use snapshot::{ConfigSnapshot, MountKind, MountSpec, RestartPolicy};
pub use types::{ContainerHandle, ContainerId, PortMapping, PortProtocol, ServiceLabel};
