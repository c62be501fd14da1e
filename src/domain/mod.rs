//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod instance;
pub mod platform;
pub mod registration;
pub mod state;

pub use config::{SupervisorConfig, Timing, validate_config};
pub use error::{ConfigError, InstanceError, SupervisorError};
pub use instance::{InstanceLayout, InstanceRecord, RepositoryTarget, TokenKind};
pub use platform::{Arch, OsFamily, Platform};
pub use registration::RegistrationToken;
pub use state::{
    InstallationState, InstanceStatus, PidRecord, ProcessSnapshot, RunState, WorkerSignature,
};
