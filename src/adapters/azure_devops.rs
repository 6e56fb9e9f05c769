//! Azure DevOps REST client (api-version 7.0).
//!
//! Converts the loosely typed classification node payloads into
//! [`IterationNode`]s. Dates only survive the conversion when both
//! `startDate` and `finishDate` are present and parseable.

use crate::domain::model::{IterationDates, IterationNode, IterationTree, Team};
use crate::domain::ports::{ConfigProvider, WorkTrackingApi};
use crate::utils::error::{Result, SyncError};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

pub const API_VERSION: &str = "7.0";
const START_DATE_KEY: &str = "startDate";
const FINISH_DATE_KEY: &str = "finishDate";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassificationNode {
    name: String,
    identifier: Option<String>,
    attributes: Option<HashMap<String, serde_json::Value>>,
    has_children: Option<bool>,
    children: Option<Vec<ClassificationNode>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateIterationRequest<'a> {
    name: &'a str,
    attributes: CreateIterationAttributes,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateIterationAttributes {
    start_date: String,
    finish_date: String,
}

#[derive(Debug, Serialize)]
struct TeamSettingsIteration<'a> {
    id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct WebApiTeam {
    id: String,
    name: String,
}

#[derive(Debug, Clone)]
pub struct AzureDevOpsClient {
    base_url: Url,
    token: String,
    client: Client,
}

impl AzureDevOpsClient {
    pub fn new(base_url: &str, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: Url::parse(base_url)?,
            token: token.into(),
            client,
        })
    }

    pub fn from_config<C: ConfigProvider>(config: &C) -> Result<Self> {
        Self::new(
            config.endpoint_uri(),
            config.credential_token(),
            Duration::from_secs(config.request_timeout_seconds()),
        )
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SyncError::ConfigError {
                message: format!("`{}` cannot be used as a base URL", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn iterations_url(&self, project: &str) -> Result<Url> {
        self.url(&[project, "_apis", "wit", "classificationnodes", "Iterations"])
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        Err(SyncError::ApiStatusError {
            status: status.as_u16(),
            url,
            body,
        })
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = Self::check_status(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl WorkTrackingApi for AzureDevOpsClient {
    async fn get_teams(&self, project: &str) -> Result<Vec<Team>> {
        let url = self.url(&["_apis", "projects", project, "teams"])?;
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .basic_auth("", Some(&self.token))
            .query(&[("api-version", API_VERSION)])
            .send()
            .await?;

        let teams: ListResponse<WebApiTeam> = Self::read_json(response).await?;
        Ok(teams
            .value
            .into_iter()
            .map(|t| Team {
                id: t.id,
                name: t.name,
            })
            .collect())
    }

    async fn get_root_iteration_node(&self, project: &str) -> Result<IterationTree> {
        let url = self.iterations_url(project)?;
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .basic_auth("", Some(&self.token))
            .query(&[("$depth", "1"), ("api-version", API_VERSION)])
            .send()
            .await?;

        let root: ClassificationNode = Self::read_json(response).await?;
        Ok(to_tree(root))
    }

    async fn create_iteration_node(
        &self,
        project: &str,
        name: &str,
        start: NaiveDate,
        finish: NaiveDate,
    ) -> Result<Option<IterationNode>> {
        let url = self.iterations_url(project)?;
        tracing::debug!("POST {} ({})", url, name);

        let request = CreateIterationRequest {
            name,
            attributes: CreateIterationAttributes {
                start_date: format_date(start),
                finish_date: format_date(finish),
            },
        };

        let response = self
            .client
            .post(url)
            .basic_auth("", Some(&self.token))
            .query(&[("api-version", API_VERSION)])
            .json(&request)
            .send()
            .await?;

        let created: Option<ClassificationNode> = Self::read_json(response).await?;
        Ok(created.map(to_node))
    }

    async fn assign_iteration_to_team(
        &self,
        project: &str,
        team: &Team,
        iteration_id: &str,
    ) -> Result<()> {
        let url = self.url(&[project, &team.name, "_apis", "work", "teamsettings", "iterations"])?;
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .basic_auth("", Some(&self.token))
            .query(&[("api-version", API_VERSION)])
            .json(&TeamSettingsIteration { id: iteration_id })
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }
}

fn to_tree(mut root: ClassificationNode) -> IterationTree {
    let children = root
        .children
        .take()
        .unwrap_or_default()
        .into_iter()
        .map(to_node)
        .collect();
    IterationTree {
        root: to_node(root),
        children,
    }
}

fn to_node(node: ClassificationNode) -> IterationNode {
    let dates = node.attributes.as_ref().and_then(|attributes| {
        let start = attribute_date(attributes, START_DATE_KEY)?;
        let finish = attribute_date(attributes, FINISH_DATE_KEY)?;
        Some(IterationDates { start, finish })
    });

    if dates.is_none() && node.attributes.is_some() {
        tracing::debug!(iteration = %node.name, "Iteration has no complete start/finish dates");
    }

    IterationNode {
        name: node.name,
        identifier: node.identifier,
        dates,
        has_children: node.has_children.unwrap_or(false),
    }
}

fn attribute_date(attributes: &HashMap<String, serde_json::Value>, key: &str) -> Option<NaiveDate> {
    let raw = attributes.get(key)?.as_str()?;
    match parse_date(raw) {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::warn!("Ignoring attribute `{}`: {}", key, e);
            None
        }
    }
}

/// Calendar date of an ISO-8601 timestamp or plain `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.date_naive());
    }
    if let Ok(timestamp) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(timestamp.date());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| SyncError::DateError {
        value: raw.to_string(),
    })
}

fn format_date(date: NaiveDate) -> String {
    format!("{}T00:00:00Z", date.format("%Y-%m-%d"))
}
