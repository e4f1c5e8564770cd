//! Result type alias for sheetbatch

use super::errors::BatchError;

/// Result type alias for sheetbatch operations
///
/// # Examples
///
/// ```
/// use sheetbatch::domain::result::Result;
/// use sheetbatch::domain::errors::BatchError;
///
/// fn failing_function() -> Result<()> {
///     Err(BatchError::Io("disk unplugged".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, BatchError>;
