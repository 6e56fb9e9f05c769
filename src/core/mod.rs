pub mod driver;
pub mod materializer;
pub mod schedule;
pub mod timeline;

pub use crate::domain::model::{IterationNode, IterationPlan, PlannedIteration, Team};
pub use crate::domain::ports::{BackfillStep, ConfigProvider, WorkTrackingApi};
pub use crate::utils::error::Result;
