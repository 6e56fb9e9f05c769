use crate::config::toml_config::{TomlConfig, DEFAULT_CONFIG_FILE};
use crate::utils::error::Result;
use chrono::NaiveDate;
use clap::Parser;
use std::path::Path;

#[derive(Debug, Clone, Parser)]
#[command(name = "iteration-sync")]
#[command(about = "Keeps Azure DevOps iteration calendars populated and contiguous")]
pub struct CliArgs {
    /// Path to TOML configuration file (defaults to ./iterations.toml when present)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Azure DevOps organization URI
    #[arg(long, env = "AZURE_DEVOPS_URI")]
    pub uri: Option<String>,

    /// Personal access token
    #[arg(long, env = "AZURE_DEVOPS_PAT", hide_env_values = true)]
    pub pat: Option<String>,

    /// Number of future iterations to guarantee
    #[arg(long)]
    pub iterations_to_create: Option<u32>,

    /// Iteration name prefix, e.g. "Sprint"
    #[arg(long)]
    pub prefix: Option<String>,

    /// Iteration length in days
    #[arg(long)]
    pub iteration_length: Option<u32>,

    /// Start date of iteration 1 when a project has no iterations (YYYY-MM-DD)
    #[arg(long)]
    pub bootstrap_start_date: Option<NaiveDate>,

    /// Projects to process; replaces the list from the config file
    #[arg(long = "project", value_delimiter = ',')]
    pub projects: Vec<String>,

    /// Keep processing the remaining projects after one fails
    #[arg(long)]
    pub continue_on_error: bool,

    /// Run date (YYYY-MM-DD), defaults to the local date
    #[arg(long)]
    pub today: Option<NaiveDate>,

    /// Show the plan without creating anything
    #[arg(long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl CliArgs {
    /// Loads the config file, if any, and applies the command line on top.
    pub fn load_config(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path);
                TomlConfig::from_file(path)?
            }
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                tracing::info!("Loading configuration from: {}", DEFAULT_CONFIG_FILE);
                TomlConfig::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => {
                tracing::debug!("No configuration file, using command line only");
                TomlConfig::default()
            }
        };

        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(uri) = &self.uri {
            config.azure_devops.uri = Some(uri.clone());
        }
        if let Some(pat) = &self.pat {
            config.azure_devops.personal_access_token = Some(pat.clone());
        }
        if let Some(count) = self.iterations_to_create {
            config.iterations.iterations_to_create = Some(count);
        }
        if let Some(prefix) = &self.prefix {
            config.iterations.name_prefix = Some(prefix.clone());
        }
        if let Some(length) = self.iteration_length {
            config.iterations.length_days = Some(length);
        }
        if let Some(date) = self.bootstrap_start_date {
            config.iterations.bootstrap_start_date = Some(date);
        }
        if !self.projects.is_empty() {
            config.run.projects = Some(self.projects.clone());
        }
        if self.continue_on_error {
            config.run.continue_on_error = Some(true);
        }
    }
}
