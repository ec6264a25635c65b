//! Union scan over the resource roots.
//!
//! Walks each root in order, drops hidden and excluded entries, and merges
//! the results into one view keyed by relative path.

mod exclude;
mod union;

pub use exclude::{ExcludeMatcher, PatternError};
pub use union::{Precedence, ScanError, ScannedFile, UnionScan};
