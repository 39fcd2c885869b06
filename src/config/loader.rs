//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{CacheBackend, CohortConfig};
use crate::domain::errors::CohortError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into CohortConfig
/// 4. Applies environment variable overrides (COHORT_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`CohortError::Configuration`] if the file cannot be read or parsed,
/// if a referenced environment variable is not set, or if validation fails.
///
/// # Examples
///
/// ```no_run
/// use cohort::config::loader::load_config;
///
/// let config = load_config("cohort.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<CohortConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(CohortError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        CohortError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: CohortConfig = toml::from_str(&contents)?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        CohortError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| CohortError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let processed = re.replace_all(line, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                    String::new()
                }
            }
        });
        lines.push(processed.into_owned());
    }

    if !missing_vars.is_empty() {
        return Err(CohortError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Applies environment variable overrides using COHORT_* prefix
///
/// Environment variables follow the pattern: COHORT_<SECTION>_<KEY>
/// For example: COHORT_TABLE_STORE_ROOT_PATH, COHORT_CACHE_BACKEND
fn apply_env_overrides(config: &mut CohortConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("COHORT_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("COHORT_APPLICATION_DRY_RUN") {
        config.application.dry_run = val.parse().unwrap_or(false);
    }

    // Table store overrides
    if let Ok(val) = std::env::var("COHORT_TABLE_STORE_PRINCIPAL_ID") {
        if let Ok(id) = val.parse() {
            config.table_store.principal_id = id;
        }
    }
    if let Ok(val) = std::env::var("COHORT_TABLE_STORE_ROOT_PATH") {
        config.table_store.root_path = val;
    }

    // Export overrides
    if let Ok(val) = std::env::var("COHORT_EXPORT_SCRATCH_DIR") {
        config.export.scratch_dir = Some(val);
    }

    // Cache overrides
    if let Ok(val) = std::env::var("COHORT_CACHE_BACKEND") {
        match val.to_lowercase().as_str() {
            "memory" => config.cache.backend = CacheBackend::Memory,
            "postgresql" => config.cache.backend = CacheBackend::PostgreSQL,
            other => tracing::warn!(value = other, "Ignoring unknown COHORT_CACHE_BACKEND"),
        }
    }
    if let Ok(val) = std::env::var("COHORT_CACHE_TABLE_PREFIX") {
        config.cache.table_prefix = val;
    }

    // Catalog overrides
    if let Ok(val) = std::env::var("COHORT_CATALOG_PATH") {
        config.catalog.path = val;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("COHORT_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(false);
    }
    if let Ok(val) = std::env::var("COHORT_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("COHORT_LOADER_TEST_VAR", "test_value");
        let input = "password = \"${COHORT_LOADER_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "password = \"test_value\"");
        std::env::remove_var("COHORT_LOADER_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("COHORT_LOADER_MISSING_VAR");
        let input = "password = \"${COHORT_LOADER_MISSING_VAR}\"";
        let err = substitute_env_vars(input).unwrap_err();
        assert!(err.to_string().contains("COHORT_LOADER_MISSING_VAR"));
    }

    #[test]
    fn test_substitute_env_vars_skips_comments() {
        let input = "# password = \"${COHORT_LOADER_COMMENTED_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, input);
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent.toml");
        assert!(matches!(result, Err(CohortError::Configuration(_))));
    }

    #[test]
    fn test_load_config_valid() {
        let toml_content = r#"
[application]
log_level = "debug"

[table_store]
principal_id = 3336429
root_path = "/var/lib/cohort/tables"

[catalog]
path = "/etc/cohort/catalog.toml"

[[columns]]
name = "healthCode"
max_size = 36

[[columns]]
name = "dataGroups"
ddb_name = "userDataGroups"
transfer_method = "STRING_SET"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.table_store.principal_id, 3336429);
        assert_eq!(config.catalog.path, "/etc/cohort/catalog.toml");
        assert_eq!(config.columns.len(), 2);
        assert_eq!(config.columns[1].source_name(), "userDataGroups");
    }

    #[test]
    fn test_load_config_invalid_values() {
        let toml_content = r#"
[table_store]
principal_id = -1

[catalog]
path = "catalog.toml"
"#;
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let err = load_config(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("principal_id"));
    }
}
