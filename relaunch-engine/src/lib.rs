//! Container engine client with pluggable backends
//!
//! This crate provides a trait-based abstraction over the container engine's
//! control API, including production and mock implementations.

#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod docker;
pub mod engine;
pub mod mock;

pub use docker::DockerEngine;
pub use engine::{ContainerDetails, ContainerEngine, EngineContainer, StopStatus};
pub use mock::{EngineCall, EngineOp, MockContainer, MockEngine};

// Re-export commonly used types
pub use relaunch_core::{ConfigSnapshot, ContainerId, ImageReference};
