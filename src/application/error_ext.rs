//! Error conversion helpers for common I/O operations
//!
//! Provides extension traits for cleaner error handling with path context.

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::StandIdentity;

/// Extension trait for converting `io::Result` to `ApplicationResult` with context.
pub trait IoResultExt<T> {
    /// Add stand and path context to an I/O error.
    ///
    /// # Example
    /// ```ignore
    /// fs.write(&path, &report)
    ///     .with_path_context(&stand, "write report", &path)?;
    /// ```
    fn with_path_context(
        self,
        stand: &StandIdentity,
        action: &str,
        path: &Path,
    ) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(
        self,
        stand: &StandIdentity,
        action: &str,
        path: &Path,
    ) -> ApplicationResult<T> {
        self.map_err(|e| ApplicationError::OperationFailed {
            context: format!("{}: {} {}", stand, action, path.display()),
            source: Box::new(e),
        })
    }
}
