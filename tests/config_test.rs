use anyhow::Result;
use iteration_sync::core::ConfigProvider;
use iteration_sync::{SyncError, TomlConfig};
use std::io::Write;
use tempfile::NamedTempFile;

const EXAMPLE_CONFIG: &str = include_str!("../iterations.example.toml");

#[test]
fn test_example_config_resolves_with_inline_token() -> Result<()> {
    let mut temp_file = NamedTempFile::new()?;
    temp_file.write_all(
        EXAMPLE_CONFIG
            .replace("${AZURE_DEVOPS_PAT}", "example-token")
            .as_bytes(),
    )?;

    let settings = TomlConfig::from_file(temp_file.path())?.resolve()?;

    assert_eq!(settings.endpoint_uri(), "https://dev.azure.com/contoso");
    assert_eq!(settings.credential_token(), "example-token");
    assert_eq!(settings.iterations_to_create(), 4);
    assert_eq!(settings.iteration_name_prefix(), "Sprint");
    assert_eq!(settings.iteration_length(), 14);
    assert_eq!(settings.projects(), ["Phoenix".to_string(), "Orion".to_string()]);
    assert!(!settings.continue_on_error());
    Ok(())
}

#[test]
fn test_example_config_takes_token_from_env() -> Result<()> {
    // Variable unique to this test so parallel tests cannot see it.
    std::env::set_var("ITERATION_SYNC_EXAMPLE_PAT", "env-token");
    let mut temp_file = NamedTempFile::new()?;
    temp_file.write_all(
        EXAMPLE_CONFIG
            .replace("${AZURE_DEVOPS_PAT}", "${ITERATION_SYNC_EXAMPLE_PAT}")
            .as_bytes(),
    )?;

    let settings = TomlConfig::from_file(temp_file.path())?.resolve()?;

    assert_eq!(settings.credential_token(), "env-token");
    Ok(())
}

#[test]
fn test_missing_config_file() {
    let err = TomlConfig::from_file("does-not-exist/iterations.toml").unwrap_err();
    assert!(matches!(err, SyncError::IoError(_)));
}

#[test]
fn test_empty_project_list_is_rejected() -> Result<()> {
    let content = EXAMPLE_CONFIG
        .replace("${AZURE_DEVOPS_PAT}", "example-token")
        .replace(r#"projects = ["Phoenix", "Orion"]"#, "projects = []");

    let err = TomlConfig::from_toml_str(&content)?.resolve().unwrap_err();

    assert!(matches!(err, SyncError::MissingConfigError { ref field } if field == "run.projects"));
    Ok(())
}
