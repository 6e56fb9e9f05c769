use crate::core::materializer::{LiveBackfill, Materializer};
use crate::core::timeline::{SimulatedBackfill, TimelineEngine, TimelineSettings};
use crate::domain::model::{ProjectReport, RunSummary};
use crate::domain::ports::{ConfigProvider, WorkTrackingApi};
use crate::utils::error::Result;
use chrono::NaiveDate;

/// Runs the iteration calendar sync over every configured project.
pub struct ProjectDriver<A: WorkTrackingApi, C: ConfigProvider> {
    api: A,
    config: C,
    settings: TimelineSettings,
    today: NaiveDate,
    dry_run: bool,
}

impl<A: WorkTrackingApi, C: ConfigProvider> ProjectDriver<A, C> {
    /// `today` is fixed for the whole run.
    pub fn new(api: A, config: C, today: NaiveDate) -> Self {
        let settings = TimelineSettings::from_config(&config);
        Self {
            api,
            config,
            settings,
            today,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Processes projects in order. Stops at the first failing project
    /// unless `continue_on_error` is set, in which case the failure is
    /// recorded in the summary.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut summary = RunSummary {
            today: Some(self.today),
            dry_run: self.dry_run,
            projects: Vec::new(),
        };

        for project in self.config.projects() {
            tracing::info!(project = %project, today = %self.today, dry_run = self.dry_run, "Processing project");

            let mut report = ProjectReport::new(project.as_str());
            match self.run_project(project, &mut report).await {
                Ok(()) => {
                    tracing::info!(
                        project = %project,
                        backfilled = report.backfilled.len(),
                        created = report.created.len(),
                        skipped = report.skipped.len(),
                        "Project done"
                    );
                    summary.projects.push(report);
                }
                Err(e) if self.config.continue_on_error() => {
                    tracing::error!(
                        project = %project,
                        backfilled = report.backfilled.len(),
                        created = report.created.len(),
                        "Project failed: {}",
                        e
                    );
                    tracing::error!("Suggestion: {}", e.recovery_suggestion());
                    report.error = Some(e.to_string());
                    summary.projects.push(report);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(summary)
    }

    /// Syncs one project, recording into `report` as iterations are created,
    /// so progress made before a failure is kept.
    pub async fn run_project(&self, project: &str, report: &mut ProjectReport) -> Result<()> {
        let teams = self.api.get_teams(project).await?;
        tracing::debug!(project, teams = teams.len(), "Loaded teams");

        let tree = self.api.get_root_iteration_node(project).await?;
        tracing::debug!(project, iterations = tree.children.len(), "Loaded iteration tree");
        if !tree.is_consistent() {
            tracing::warn!(
                project,
                has_children = tree.root.has_children,
                children = tree.children.len(),
                "Root iteration flag disagrees with the children returned"
            );
        }
        for node in tree.nested() {
            tracing::warn!(project, iteration = %node.name, "Nested iterations are not managed, ignoring them");
        }

        let engine = TimelineEngine::new(&self.settings, project, self.today);

        if self.dry_run {
            let mut backfill = SimulatedBackfill::new(tree.children.clone());
            let outcome = engine.plan(tree.children, &mut backfill).await?;
            for planned in outcome.backfilled.iter().chain(outcome.plan.iter()) {
                tracing::info!(
                    project,
                    iteration = %planned.name,
                    start = %planned.start,
                    finish = %planned.finish,
                    "[dry run] Would create iteration"
                );
            }
            report.backfilled = outcome.backfilled.iter().map(|p| p.name.clone()).collect();
            report.created = outcome.plan.iter().map(|p| p.name.clone()).collect();
            report.skipped = outcome.skipped;
            return Ok(());
        }

        let materializer = Materializer::new(&self.api, project, &teams);

        let mut backfill = LiveBackfill::new(&materializer);
        let result = engine.plan(tree.children, &mut backfill).await;
        for materialized in backfill.into_materialized() {
            report.record_backfilled(&materialized);
        }
        let outcome = result?;

        for name in &outcome.skipped {
            tracing::info!(project, iteration = %name, "Iteration already exists, skipping");
        }
        report.skipped = outcome.skipped.clone();

        for planned in &outcome.plan {
            let materialized = materializer.materialize(planned).await?;
            report.record_created(&materialized);
        }

        Ok(())
    }
}
