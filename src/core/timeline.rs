//! Iteration timeline continuity.
//!
//! Given the iterations a project already has and the run date, decides
//! which iterations must be created so that the calendar is contiguous up
//! to today and extends `iterations_to_create` iterations past the current
//! one. The calendar is in one of three states:
//!
//! - empty: bootstrap from the configured start date;
//! - every iteration dated: backfill missed iterations until one is
//!   current, then plan forward from it;
//! - some iterations undated: unsupported, the operator has to fix it.
//!
//! Backfilled iterations are made to exist through a [`BackfillStep`]
//! while planning, because each one decides whether another is needed.
//! Everything else is returned as a plan for the materializer.

use crate::core::schedule::{
    finish_date_of, iteration_name, next_sequence_number, next_start_date,
};
use crate::domain::model::{IterationNode, IterationPlan, PlannedIteration};
use crate::domain::ports::{BackfillStep, ConfigProvider};
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineSettings {
    pub prefix: String,
    pub iteration_length: u32,
    pub iterations_to_create: u32,
    pub bootstrap_start_date: NaiveDate,
}

impl TimelineSettings {
    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        Self {
            prefix: config.iteration_name_prefix().to_string(),
            iteration_length: config.iteration_length(),
            iterations_to_create: config.iterations_to_create(),
            bootstrap_start_date: config.bootstrap_start_date(),
        }
    }
}

/// An existing iteration with both dates known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedIteration {
    pub name: String,
    pub start: NaiveDate,
    pub finish: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarState {
    Empty,
    FullyDated(Vec<DatedIteration>),
    /// Names of the iterations lacking a start or finish date.
    PartiallyDated(Vec<String>),
}

pub fn classify(children: &[IterationNode]) -> CalendarState {
    if children.is_empty() {
        return CalendarState::Empty;
    }

    let undated: Vec<String> = children
        .iter()
        .filter(|c| c.dates.is_none())
        .map(|c| c.name.clone())
        .collect();
    if !undated.is_empty() {
        return CalendarState::PartiallyDated(undated);
    }

    CalendarState::FullyDated(
        children
            .iter()
            .filter_map(|c| {
                c.dates.map(|d| DatedIteration {
                    name: c.name.clone(),
                    start: d.start,
                    finish: d.finish,
                })
            })
            .collect(),
    )
}

/// The iteration strictly containing `today`. A boundary day does not count.
pub fn find_current(
    iterations: &[DatedIteration],
    today: NaiveDate,
) -> Result<Option<&DatedIteration>> {
    let current: Vec<&DatedIteration> = iterations
        .iter()
        .filter(|i| i.start < today && today < i.finish)
        .collect();

    match current.as_slice() {
        [] => Ok(None),
        [single] => Ok(Some(*single)),
        _ => Err(SyncError::OverlappingIterations {
            today,
            names: current.iter().map(|i| i.name.clone()).collect(),
        }),
    }
}

pub fn latest_iteration(iterations: &[DatedIteration]) -> Option<&DatedIteration> {
    iterations.iter().max_by_key(|i| i.finish)
}

/// Direct successor of `prior`: next number, starting the day after it ends.
pub fn successor_of(prior: &DatedIteration, settings: &TimelineSettings) -> Result<PlannedIteration> {
    let sequence_number = next_sequence_number(&prior.name, &settings.prefix)?;
    let start = next_start_date(prior.finish);
    Ok(PlannedIteration {
        name: iteration_name(&settings.prefix, sequence_number),
        sequence_number,
        start,
        finish: finish_date_of(start, settings.iteration_length),
    })
}

/// `count` back-to-back iterations from `sequence_number`/`start`. Names in
/// `existing` are reported as skipped but still advance the cursor.
fn consecutive(
    settings: &TimelineSettings,
    mut sequence_number: u32,
    mut start: NaiveDate,
    existing: &HashSet<String>,
) -> (IterationPlan, Vec<String>) {
    let mut plan = Vec::new();
    let mut skipped = Vec::new();

    for _ in 0..settings.iterations_to_create {
        let name = iteration_name(&settings.prefix, sequence_number);
        let finish = finish_date_of(start, settings.iteration_length);

        if existing.contains(&name) {
            skipped.push(name);
        } else {
            plan.push(PlannedIteration {
                name,
                sequence_number,
                start,
                finish,
            });
        }

        sequence_number += 1;
        start = next_start_date(finish);
    }

    (plan, skipped)
}

pub fn bootstrap_plan(settings: &TimelineSettings) -> IterationPlan {
    consecutive(settings, 1, settings.bootstrap_start_date, &HashSet::new()).0
}

pub fn forward_plan(
    anchor: &DatedIteration,
    existing: &HashSet<String>,
    settings: &TimelineSettings,
) -> Result<(IterationPlan, Vec<String>)> {
    let sequence_number = next_sequence_number(&anchor.name, &settings.prefix)?;
    Ok(consecutive(
        settings,
        sequence_number,
        next_start_date(anchor.finish),
        existing,
    ))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineOutcome {
    /// Already created through the backfill step.
    pub backfilled: Vec<PlannedIteration>,
    /// Still to be materialized, in order.
    pub plan: IterationPlan,
    /// Forward candidates that already exist.
    pub skipped: Vec<String>,
}

pub struct TimelineEngine<'a> {
    settings: &'a TimelineSettings,
    project: &'a str,
    today: NaiveDate,
}

impl<'a> TimelineEngine<'a> {
    pub fn new(settings: &'a TimelineSettings, project: &'a str, today: NaiveDate) -> Self {
        Self {
            settings,
            project,
            today,
        }
    }

    pub async fn plan<B: BackfillStep>(
        &self,
        children: Vec<IterationNode>,
        backfill: &mut B,
    ) -> Result<TimelineOutcome> {
        let mut iterations = match classify(&children) {
            CalendarState::Empty => {
                tracing::info!(project = self.project, "No iterations yet, bootstrapping calendar");
                return Ok(TimelineOutcome {
                    plan: bootstrap_plan(self.settings),
                    ..TimelineOutcome::default()
                });
            }
            CalendarState::PartiallyDated(undated) => return Err(self.unsupported(undated)),
            CalendarState::FullyDated(iterations) => iterations,
        };

        let mut backfilled = Vec::new();

        let anchor = loop {
            if let Some(current) = find_current(&iterations, self.today)? {
                tracing::debug!(project = self.project, current = %current.name, "Found current iteration");
                break current.clone();
            }

            let latest = latest_iteration(&iterations).ok_or_else(|| self.no_current())?;

            if latest.start > self.today {
                // Calendar already reaches past today; only valid when today is a boundary day.
                let anchor = self.boundary_anchor(&iterations)?;
                tracing::warn!(
                    project = self.project,
                    anchor = %anchor.name,
                    today = %self.today,
                    "No iteration strictly contains today, planning from the one starting last before it"
                );
                break anchor;
            }

            let next = successor_of(latest, self.settings)?;
            tracing::info!(
                project = self.project,
                iteration = %next.name,
                start = %next.start,
                finish = %next.finish,
                "Backfilling missed iteration"
            );

            let refreshed = backfill.backfill(&next).await?;
            backfilled.push(next);

            iterations = match classify(&refreshed) {
                CalendarState::FullyDated(iterations) => iterations,
                CalendarState::PartiallyDated(undated) => return Err(self.unsupported(undated)),
                CalendarState::Empty => return Err(self.unsupported(Vec::new())),
            };
        };

        let existing: HashSet<String> = iterations.iter().map(|i| i.name.clone()).collect();
        let (plan, skipped) = forward_plan(&anchor, &existing, self.settings)?;
        self.check_no_overlap(&plan, &iterations)?;

        Ok(TimelineOutcome {
            backfilled,
            plan,
            skipped,
        })
    }

    /// Iteration starting last on or before today, provided the next one
    /// starts the day after it ends. A hand-made gap around today has no
    /// safe anchor.
    fn boundary_anchor(&self, iterations: &[DatedIteration]) -> Result<DatedIteration> {
        let anchor = iterations
            .iter()
            .filter(|i| i.start <= self.today)
            .max_by_key(|i| i.start)
            .ok_or_else(|| self.no_current())?;

        let contiguous = iterations
            .iter()
            .filter(|i| i.start > anchor.start)
            .min_by_key(|i| i.start)
            .is_some_and(|next| next.start == next_start_date(anchor.finish));

        if !contiguous {
            return Err(self.no_current());
        }
        Ok(anchor.clone())
    }

    /// Planned iterations must not overlap any existing one, whatever its name.
    fn check_no_overlap(&self, plan: &[PlannedIteration], iterations: &[DatedIteration]) -> Result<()> {
        for planned in plan {
            if let Some(existing) = iterations
                .iter()
                .find(|i| planned.start <= i.finish && i.start <= planned.finish)
            {
                return Err(SyncError::OverlappingIterations {
                    today: self.today,
                    names: vec![existing.name.clone(), planned.name.clone()],
                });
            }
        }
        Ok(())
    }

    fn unsupported(&self, undated: Vec<String>) -> SyncError {
        SyncError::UnsupportedCalendarState {
            project: self.project.to_string(),
            undated,
        }
    }

    fn no_current(&self) -> SyncError {
        SyncError::NoCurrentIteration {
            project: self.project.to_string(),
            today: self.today,
        }
    }
}

/// Backfill step that only records the iteration in memory. Used for dry runs.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackfill {
    children: Vec<IterationNode>,
}

impl SimulatedBackfill {
    pub fn new(children: Vec<IterationNode>) -> Self {
        Self { children }
    }
}

#[async_trait]
impl BackfillStep for SimulatedBackfill {
    async fn backfill(&mut self, planned: &PlannedIteration) -> Result<Vec<IterationNode>> {
        self.children.push(planned.to_node());
        Ok(self.children.clone())
    }
}
