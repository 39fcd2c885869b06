//! Result type alias for Cohort
//!
//! This module provides a convenient Result type alias that uses CohortError
//! as the error type.

use super::errors::CohortError;

/// Result type alias for Cohort operations
///
/// # Examples
///
/// ```
/// use cohort::domain::result::Result;
/// use cohort::domain::errors::CohortError;
///
/// fn failing_function() -> Result<()> {
///     Err(CohortError::Schema("schema not found".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, CohortError>;
