//! Observed episodes and the source they are fetched from.
//!
//! An `EpisodeSource` returns whatever episodes are currently observable for
//! a series. Implementations may hit the network and fail; callers handle
//! failures per series.

mod source;
mod types;

pub use source::{EpisodeSource, SourceError};
pub use types::*;
