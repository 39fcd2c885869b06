//! PostgreSQL integration
//!
//! This module provides the PostgreSQL-backed table-id cache, shared by every
//! export run of a deployment.

pub mod cache;
pub mod client;

pub use cache::PostgresTableIdCache;
pub use client::PostgreSQLClient;
