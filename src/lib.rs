pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;

pub use adapters::azure_devops::AzureDevOpsClient;
pub use config::{Settings, TomlConfig};
pub use core::driver::ProjectDriver;
pub use core::timeline::{TimelineEngine, TimelineOutcome, TimelineSettings};
pub use domain::model::{IterationNode, PlannedIteration, RunSummary};
pub use utils::error::{Result, SyncError};
