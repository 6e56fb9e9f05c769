use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Start and finish day of an iteration, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationDates {
    pub start: NaiveDate,
    pub finish: NaiveDate,
}

/// One iteration node as read from, or created in, the work-tracking system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationNode {
    pub name: String,
    /// Handle assigned by the remote system; required for team assignment.
    pub identifier: Option<String>,
    /// `None` unless both the start and the finish date are set.
    pub dates: Option<IterationDates>,
    pub has_children: bool,
}

impl IterationNode {
    pub fn dated(name: impl Into<String>, start: NaiveDate, finish: NaiveDate) -> Self {
        Self {
            name: name.into(),
            identifier: None,
            dates: Some(IterationDates { start, finish }),
            has_children: false,
        }
    }

    pub fn undated(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identifier: None,
            dates: None,
            has_children: false,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

/// Root iteration node of a project with its direct children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationTree {
    pub root: IterationNode,
    pub children: Vec<IterationNode>,
}

impl IterationTree {
    /// Whether the root's `has_children` flag matches the children returned.
    pub fn is_consistent(&self) -> bool {
        self.root.has_children != self.children.is_empty()
    }

    /// Children that have sub-iterations of their own.
    pub fn nested(&self) -> impl Iterator<Item = &IterationNode> {
        self.children.iter().filter(|c| c.has_children)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
}

/// An iteration the timeline engine wants to exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedIteration {
    pub name: String,
    pub sequence_number: u32,
    pub start: NaiveDate,
    pub finish: NaiveDate,
}

impl PlannedIteration {
    pub fn to_node(&self) -> IterationNode {
        IterationNode::dated(self.name.clone(), self.start, self.finish)
    }
}

pub type IterationPlan = Vec<PlannedIteration>;

/// Outcome of materializing one planned iteration.
#[derive(Debug, Clone)]
pub struct MaterializedIteration {
    pub node: IterationNode,
    pub failed_teams: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectReport {
    pub project: String,
    pub backfilled: Vec<String>,
    pub created: Vec<String>,
    pub skipped: Vec<String>,
    pub failed_assignments: Vec<FailedAssignment>,
    pub error: Option<String>,
}

impl ProjectReport {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            ..Self::default()
        }
    }

    pub fn record_backfilled(&mut self, materialized: &MaterializedIteration) {
        self.backfilled.push(materialized.node.name.clone());
        self.record_failed_teams(materialized);
    }

    pub fn record_created(&mut self, materialized: &MaterializedIteration) {
        self.created.push(materialized.node.name.clone());
        self.record_failed_teams(materialized);
    }

    fn record_failed_teams(&mut self, materialized: &MaterializedIteration) {
        self.failed_assignments
            .extend(materialized.failed_teams.iter().map(|team| FailedAssignment {
                iteration: materialized.node.name.clone(),
                team: team.clone(),
            }));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedAssignment {
    pub iteration: String,
    pub team: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub today: Option<NaiveDate>,
    pub dry_run: bool,
    pub projects: Vec<ProjectReport>,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.projects.iter().any(|p| p.error.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tree(root_has_children: bool, children: Vec<IterationNode>) -> IterationTree {
        let mut root = IterationNode::undated("Phoenix");
        root.has_children = root_has_children;
        IterationTree { root, children }
    }

    #[test]
    fn test_tree_consistency() {
        let sprint = IterationNode::dated("Sprint 1", date(2024, 1, 1), date(2024, 1, 14));

        assert!(tree(false, vec![]).is_consistent());
        assert!(tree(true, vec![sprint.clone()]).is_consistent());
        assert!(!tree(true, vec![]).is_consistent());
        assert!(!tree(false, vec![sprint]).is_consistent());
    }

    #[test]
    fn test_nested_children() {
        let mut parent = IterationNode::undated("Release 1");
        parent.has_children = true;
        let flat = IterationNode::undated("Sprint 1");

        let tree = tree(true, vec![parent, flat]);
        let nested: Vec<&str> = tree.nested().map(|n| n.name.as_str()).collect();

        assert_eq!(nested, vec!["Release 1"]);
    }

    #[test]
    fn test_report_records_failed_teams() {
        let mut report = ProjectReport::new("Phoenix");
        report.record_backfilled(&MaterializedIteration {
            node: IterationNode::undated("Sprint 6"),
            failed_teams: vec![],
        });
        report.record_created(&MaterializedIteration {
            node: IterationNode::undated("Sprint 7"),
            failed_teams: vec!["Bravo".to_string()],
        });

        assert_eq!(report.backfilled, vec!["Sprint 6"]);
        assert_eq!(report.created, vec!["Sprint 7"]);
        assert_eq!(
            report.failed_assignments,
            vec![FailedAssignment {
                iteration: "Sprint 7".to_string(),
                team: "Bravo".to_string(),
            }]
        );
    }
}
