//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Cohort configuration file.

use crate::config::load_config;
use crate::config::schema::CacheBackend;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// Loading already validates, so a loaded configuration is a valid one.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Dry Run: {}", config.application.dry_run);
        println!("  Table Store Root: {}", config.table_store.root_path);
        println!("  Admin Principal: {}", config.table_store.principal_id);
        println!("  Catalog: {}", config.catalog.path);

        match config.cache.backend {
            CacheBackend::Memory => println!("  Table-id Cache: memory"),
            CacheBackend::PostgreSQL => {
                if let Some(ref pg_config) = config.cache.postgresql {
                    use secrecy::ExposeSecret;
                    println!("  Table-id Cache: PostgreSQL");
                    println!(
                        "  PostgreSQL Connection: {}",
                        crate::config::redact_url(pg_config.connection_string.expose_secret())
                    );
                    println!("  Max Connections: {}", pg_config.max_connections);
                }
            }
        }
        println!("  Cache Key Prefix: {:?}", config.cache.table_prefix);
        println!(
            "  Common Columns: {:?}",
            config.columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
        );
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_validate_missing_file() {
        let args = ValidateArgs {};
        assert_eq!(args.execute("does-not-exist.toml").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_validate_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[table_store]\nprincipal_id = 1\n\n[catalog]\npath = \"catalog.toml\"\n")
            .unwrap();
        file.flush().unwrap();

        let args = ValidateArgs {};
        let path = file.path().to_str().unwrap().to_string();
        assert_eq!(args.execute(&path).await.unwrap(), 0);
    }
}
