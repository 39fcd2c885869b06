//! Local collaborators
//!
//! A filesystem-backed [`LocalTableStore`] and a catalog-file backed
//! [`FileStudyDirectory`], used by the CLI and for running exports without a
//! remote table store.

pub mod directory;
pub mod store;

pub use directory::FileStudyDirectory;
pub use store::{LocalTableInfo, LocalTableStore};
