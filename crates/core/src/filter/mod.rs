//! Episode filtering: per-subscription rules plus caller-supplied bounds
//! and deduplication.

mod dedup;
mod rules;

pub use dedup::{dedup_first, EpisodeBounds};
pub use rules::{apply, compile_regex, parse_list, FilterError, FilterRules};
