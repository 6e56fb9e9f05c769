use crate::domain::model::{IterationNode, IterationTree, PlannedIteration, Team};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// Read/write access to the iteration calendar of a work-tracking system.
#[async_trait]
pub trait WorkTrackingApi: Send + Sync {
    async fn get_teams(&self, project: &str) -> Result<Vec<Team>>;

    /// Root iteration node and its direct children (depth 1).
    async fn get_root_iteration_node(&self, project: &str) -> Result<IterationTree>;

    /// `Ok(None)` when the remote system accepted the call but returned no node.
    async fn create_iteration_node(
        &self,
        project: &str,
        name: &str,
        start: NaiveDate,
        finish: NaiveDate,
    ) -> Result<Option<IterationNode>>;

    async fn assign_iteration_to_team(
        &self,
        project: &str,
        team: &Team,
        iteration_id: &str,
    ) -> Result<()>;
}

/// One backfill step: make `planned` exist, then hand back the refreshed
/// list of project iterations.
#[async_trait]
pub trait BackfillStep: Send {
    async fn backfill(&mut self, planned: &PlannedIteration) -> Result<Vec<IterationNode>>;
}

pub trait ConfigProvider: Send + Sync {
    fn endpoint_uri(&self) -> &str;
    fn credential_token(&self) -> &str;
    fn iterations_to_create(&self) -> u32;
    fn iteration_name_prefix(&self) -> &str;
    fn iteration_length(&self) -> u32;
    fn bootstrap_start_date(&self) -> NaiveDate;
    fn projects(&self) -> &[String];
    fn continue_on_error(&self) -> bool;

    fn request_timeout_seconds(&self) -> u64 {
        30
    }
}
