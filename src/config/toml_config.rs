use crate::core::ConfigProvider;
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "iterations.toml";

/// Raw configuration file. Every value is optional here so the command
/// line can fill in or override anything; [`TomlConfig::resolve`] turns it
/// into [`Settings`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub azure_devops: AzureDevOpsConfig,
    pub iterations: IterationsConfig,
    pub run: RunConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AzureDevOpsConfig {
    pub uri: Option<String>,
    pub personal_access_token: Option<String>,
    pub request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IterationsConfig {
    pub iterations_to_create: Option<u32>,
    pub name_prefix: Option<String>,
    pub length_days: Option<u32>,
    pub bootstrap_start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub projects: Option<Vec<String>>,
    pub continue_on_error: Option<bool>,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub endpoint_uri: String,
    pub credential_token: String,
    pub request_timeout_seconds: u64,
    pub iterations_to_create: u32,
    pub iteration_name_prefix: String,
    pub iteration_length: u32,
    pub bootstrap_start_date: NaiveDate,
    pub projects: Vec<String>,
    pub continue_on_error: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SyncError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SyncError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${AZURE_DEVOPS_PAT})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SyncError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn resolve(self) -> Result<Settings> {
        let settings = Settings {
            endpoint_uri: validation::validate_required_field("azure_devops.uri", &self.azure_devops.uri)?
                .clone(),
            credential_token: validation::validate_required_field(
                "azure_devops.personal_access_token",
                &self.azure_devops.personal_access_token,
            )?
            .clone(),
            request_timeout_seconds: self.azure_devops.request_timeout_seconds.unwrap_or(30),
            iterations_to_create: *validation::validate_required_field(
                "iterations.iterations_to_create",
                &self.iterations.iterations_to_create,
            )?,
            iteration_name_prefix: validation::validate_required_field(
                "iterations.name_prefix",
                &self.iterations.name_prefix,
            )?
            .clone(),
            iteration_length: *validation::validate_required_field(
                "iterations.length_days",
                &self.iterations.length_days,
            )?,
            bootstrap_start_date: *validation::validate_required_field(
                "iterations.bootstrap_start_date",
                &self.iterations.bootstrap_start_date,
            )?,
            projects: self.run.projects.clone().unwrap_or_default(),
            continue_on_error: self.run.continue_on_error.unwrap_or(false),
        };

        settings.validate()?;
        Ok(settings)
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validation::validate_url("azure_devops.uri", &self.endpoint_uri)?;
        validation::validate_non_empty_string(
            "azure_devops.personal_access_token",
            &self.credential_token,
        )?;
        if self.credential_token.starts_with("${") {
            return Err(SyncError::InvalidConfigValueError {
                field: "azure_devops.personal_access_token".to_string(),
                value: self.credential_token.clone(),
                reason: "Environment variable is not set".to_string(),
            });
        }
        validation::validate_positive_number(
            "azure_devops.request_timeout_seconds",
            u32::try_from(self.request_timeout_seconds).unwrap_or(u32::MAX),
            1,
        )?;
        validation::validate_positive_number(
            "iterations.iterations_to_create",
            self.iterations_to_create,
            1,
        )?;
        validation::validate_positive_number("iterations.length_days", self.iteration_length, 1)?;
        validation::validate_non_empty_string("iterations.name_prefix", &self.iteration_name_prefix)?;
        validation::validate_non_empty_list("run.projects", &self.projects)?;
        Ok(())
    }
}

impl ConfigProvider for Settings {
    fn endpoint_uri(&self) -> &str {
        &self.endpoint_uri
    }

    fn credential_token(&self) -> &str {
        &self.credential_token
    }

    fn iterations_to_create(&self) -> u32 {
        self.iterations_to_create
    }

    fn iteration_name_prefix(&self) -> &str {
        &self.iteration_name_prefix
    }

    fn iteration_length(&self) -> u32 {
        self.iteration_length
    }

    fn bootstrap_start_date(&self) -> NaiveDate {
        self.bootstrap_start_date
    }

    fn projects(&self) -> &[String] {
        &self.projects
    }

    fn continue_on_error(&self) -> bool {
        self.continue_on_error
    }

    fn request_timeout_seconds(&self) -> u64 {
        self.request_timeout_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL_CONFIG: &str = r#"
[azure_devops]
uri = "https://dev.azure.com/contoso"
personal_access_token = "secret"

[iterations]
iterations_to_create = 4
name_prefix = "Sprint"
length_days = 14
bootstrap_start_date = "2024-01-01"

[run]
projects = ["Phoenix", "Orion"]
"#;

    #[test]
    fn test_parse_and_resolve_config() {
        let settings = TomlConfig::from_toml_str(FULL_CONFIG).unwrap().resolve().unwrap();

        assert_eq!(settings.endpoint_uri, "https://dev.azure.com/contoso");
        assert_eq!(settings.iterations_to_create, 4);
        assert_eq!(settings.iteration_length, 14);
        assert_eq!(
            settings.bootstrap_start_date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
        assert_eq!(settings.projects, vec!["Phoenix", "Orion"]);
        assert!(!settings.continue_on_error);
        assert_eq!(settings.request_timeout_seconds, 30);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("ITERATION_SYNC_TEST_PAT", "from-env");

        let content = FULL_CONFIG.replace("\"secret\"", "\"${ITERATION_SYNC_TEST_PAT}\"");
        let config = TomlConfig::from_toml_str(&content).unwrap();
        assert_eq!(
            config.azure_devops.personal_access_token.as_deref(),
            Some("from-env")
        );

        std::env::remove_var("ITERATION_SYNC_TEST_PAT");
    }

    #[test]
    fn test_unset_env_var_fails_validation() {
        let content = FULL_CONFIG.replace("\"secret\"", "\"${ITERATION_SYNC_UNSET_VARIABLE}\"");
        let err = TomlConfig::from_toml_str(&content).unwrap().resolve().unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfigValueError { .. }));
    }

    #[test]
    fn test_missing_required_value() {
        let content = FULL_CONFIG.replace("length_days = 14\n", "");
        let err = TomlConfig::from_toml_str(&content).unwrap().resolve().unwrap_err();
        match err {
            SyncError::MissingConfigError { field } => assert_eq!(field, "iterations.length_days"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_zero_iteration_length_is_rejected() {
        let content = FULL_CONFIG.replace("length_days = 14", "length_days = 0");
        let err = TomlConfig::from_toml_str(&content).unwrap().resolve().unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfigValueError { ref field, .. } if field == "iterations.length_days"));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(FULL_CONFIG.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.iterations.name_prefix.as_deref(), Some("Sprint"));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            TomlConfig::from_toml_str("[iterations\nlength_days = 14"),
            Err(SyncError::ConfigError { .. })
        ));
    }
}
