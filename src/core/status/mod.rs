//! Live status surfaces
//!
//! Both surfaces are rewritten synchronously by the batch runner after each
//! attempt, through the atomic write primitive:
//!
//! - [`ProgressWriter`]: where the run is right now
//! - [`FailureSurface`]: which keys are currently failing

pub mod failures;
pub mod progress;

pub use failures::{read_failures, FailureDocument, FailureRow, FailureSurface};
pub use progress::{read_progress, ProgressState, ProgressWriter, RunState};
