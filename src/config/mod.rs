//! Configuration management for Cohort.
//!
//! TOML configuration with `${VAR_NAME}` substitution, `COHORT_*` environment
//! overrides and per-section validation.
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - log level, dry run
//! - [`TableStoreConfig`] - admin principal, local store paths
//! - [`ExportConfig`] - scratch directory, large text threshold, progress period
//! - [`CacheConfig`] - table-id cache backend
//! - [`CatalogConfig`] - study and schema catalog
//! - `columns` - common column definitions
//! - [`LoggingConfig`] - file logging
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [table_store]
//! principal_id = 3336429
//! root_path = "./table-store"
//!
//! [cache]
//! backend = "postgresql"
//!
//! [cache.postgresql]
//! connection_string = "${COHORT_PG_URL}"
//!
//! [catalog]
//! path = "./catalog.toml"
//!
//! [[columns]]
//! name = "healthCode"
//! max_size = 36
//! ```
//!
//! # Validation
//!
//! ```rust,no_run
//! use cohort::config::load_config;
//!
//! match load_config("cohort.toml") {
//!     Ok(_) => println!("Configuration valid"),
//!     Err(e) => eprintln!("Configuration error: {}", e),
//! }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::load_config;
pub use schema::{
    default_column_definitions, ApplicationConfig, CacheBackend, CacheConfig, CatalogConfig,
    CohortConfig, ExportConfig, LoggingConfig, PostgreSQLConfig, TableStoreConfig,
};
pub use secret::{redact_url, secret_string, SecretString, SecretValue};
