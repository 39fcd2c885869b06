//! External system integrations for Cohort.
//!
//! This module defines the collaborator traits of the export pipeline and
//! their implementations:
//!
//! - [`traits`] - `TableStore`, `TableIdCache` and `StudyDirectory`
//! - [`memory`] - In-process table-id cache
//! - [`postgresql`] - PostgreSQL table-id cache
//! - [`local`] - Filesystem table store and catalog-file study directory
//! - [`factory`] - Construction from configuration
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with fake implementations. The pipeline only sees the traits,
//! held as `Arc<dyn Trait>`.
//!
//! # Example
//!
//! ```rust,no_run
//! use cohort::adapters::factory::create_table_id_cache;
//! use cohort::config::CacheConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = create_table_id_cache(&CacheConfig::default()).await?;
//! let table_id = cache.set_if_absent("cohort-my-study-default", "tbl-1").await?;
//! assert_eq!(table_id, "tbl-1");
//! # Ok(())
//! # }
//! ```

pub mod factory;
pub mod local;
pub mod memory;
pub mod postgresql;
pub mod traits;

pub use factory::{create_study_directory, create_table_id_cache, create_table_store};
pub use traits::{StudyDirectory, TableIdCache, TableStore};
