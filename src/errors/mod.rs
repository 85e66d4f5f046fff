//! Centralized error handling for m3u-export
//!
//! Failures are caught at the source-pipeline boundary: an error anywhere in
//! a source's fetch/parse/filter/write chain aborts that source only and is
//! reported by the run driver, never propagated to sibling sources.

pub mod types;

pub use types::*;

/// Convenience type alias for Results using SourceError
pub type SourceResult<T> = Result<T, SourceError>;
