use crate::domain::model::{
    IterationNode, MaterializedIteration, PlannedIteration, Team,
};
use crate::domain::ports::{BackfillStep, WorkTrackingApi};
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;

/// Creates planned iterations in one project and links them to its teams.
pub struct Materializer<'a, A: WorkTrackingApi> {
    api: &'a A,
    project: &'a str,
    teams: &'a [Team],
}

impl<'a, A: WorkTrackingApi> Materializer<'a, A> {
    pub fn new(api: &'a A, project: &'a str, teams: &'a [Team]) -> Self {
        Self { api, project, teams }
    }

    pub async fn materialize(&self, planned: &PlannedIteration) -> Result<MaterializedIteration> {
        let created = self
            .api
            .create_iteration_node(self.project, &planned.name, planned.start, planned.finish)
            .await?;

        let (node, identifier) = match created {
            Some(node) => match node.identifier.clone() {
                Some(identifier) => (node, identifier),
                None => return Err(self.creation_failed(planned)),
            },
            None => return Err(self.creation_failed(planned)),
        };

        tracing::info!(
            project = self.project,
            iteration = %planned.name,
            start = %planned.start,
            finish = %planned.finish,
            "Created iteration"
        );

        let failed_teams = self.assign_to_teams(&planned.name, &identifier).await;

        Ok(MaterializedIteration { node, failed_teams })
    }

    /// Assigns to every team; failures are logged and returned, never raised.
    async fn assign_to_teams(&self, iteration: &str, identifier: &str) -> Vec<String> {
        let mut failed = Vec::new();

        for team in self.teams {
            match self
                .api
                .assign_iteration_to_team(self.project, team, identifier)
                .await
            {
                Ok(()) => {
                    tracing::debug!(project = self.project, iteration, team = %team.name, "Assigned iteration to team");
                }
                Err(e) => {
                    let failure = SyncError::TeamAssignmentFailed {
                        team: team.name.clone(),
                        iteration: iteration.to_string(),
                        message: e.to_string(),
                    };
                    tracing::warn!(project = self.project, "{}", failure);
                    tracing::warn!("Suggestion: {}", failure.recovery_suggestion());
                    failed.push(team.name.clone());
                }
            }
        }

        failed
    }

    fn creation_failed(&self, planned: &PlannedIteration) -> SyncError {
        SyncError::IterationCreationFailed {
            project: self.project.to_string(),
            name: planned.name.clone(),
        }
    }
}

/// Backfill step against the live system: create the iteration, then
/// re-read the project's iterations.
pub struct LiveBackfill<'a, A: WorkTrackingApi> {
    materializer: &'a Materializer<'a, A>,
    materialized: Vec<MaterializedIteration>,
    created: Vec<IterationNode>,
}

impl<'a, A: WorkTrackingApi> LiveBackfill<'a, A> {
    pub fn new(materializer: &'a Materializer<'a, A>) -> Self {
        Self {
            materializer,
            materialized: Vec::new(),
            created: Vec::new(),
        }
    }

    pub fn into_materialized(self) -> Vec<MaterializedIteration> {
        self.materialized
    }
}

#[async_trait]
impl<'a, A: WorkTrackingApi> BackfillStep for LiveBackfill<'a, A> {
    async fn backfill(&mut self, planned: &PlannedIteration) -> Result<Vec<IterationNode>> {
        let materialized = self.materializer.materialize(planned).await?;
        self.created.push(planned.to_node());
        self.materialized.push(materialized);

        let mut children = self
            .materializer
            .api
            .get_root_iteration_node(self.materializer.project)
            .await?
            .children;

        // Reads may lag behind the creates; keep the loop moving forward.
        for node in &self.created {
            if !children.iter().any(|c| c.name == node.name) {
                tracing::debug!(iteration = %node.name, "Created iteration not visible yet, merging locally");
                children.push(node.clone());
            }
        }

        Ok(children)
    }
}
