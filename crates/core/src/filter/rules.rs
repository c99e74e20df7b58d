//! Compiled subscription filter rules.

use regex_lite::Regex;
use thiserror::Error;

use crate::episode::Episode;
use crate::subscription::{Subscription, SubscriptionFilters};

/// Errors for filter compilation.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("Invalid regex '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },
}

/// Compile a title pattern. Matching is case-insensitive.
pub fn compile_regex(pattern: &str) -> Result<Regex, FilterError> {
    Regex::new(&format!("(?i){}", pattern)).map_err(|e| FilterError::InvalidRegex {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Split comma-separated user input into trimmed, non-empty pieces.
pub fn parse_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Filters in matchable form.
///
/// Rules run in order: subtitle group, include, exclude, regex. An empty
/// rule does not filter.
#[derive(Debug, Clone, Default)]
pub struct FilterRules {
    subtitle_groups: Vec<String>,
    include: Vec<String>,
    exclude: Vec<String>,
    regex: Option<Regex>,
}

impl FilterRules {
    pub fn from_filters(filters: &SubscriptionFilters) -> Result<Self, FilterError> {
        let regex = match filters.regex.as_deref() {
            Some(pattern) if !pattern.is_empty() => Some(compile_regex(pattern)?),
            _ => None,
        };

        Ok(Self {
            subtitle_groups: filters.subtitle_groups.clone(),
            include: lowercase_all(&filters.include),
            exclude: lowercase_all(&filters.exclude),
            regex,
        })
    }

    /// Rules with only a title pattern, as used by search.
    pub fn with_regex(pattern: &str) -> Result<Self, FilterError> {
        Ok(Self {
            regex: Some(compile_regex(pattern)?),
            ..Self::default()
        })
    }

    pub fn matches(&self, episode: &Episode) -> bool {
        if !self.subtitle_groups.is_empty() {
            match episode.subtitle_group {
                Some(ref group) if self.subtitle_groups.contains(group) => {}
                _ => return false,
            }
        }

        let title = episode.title.to_lowercase();

        if !self.include.is_empty() && !self.include.iter().any(|s| title.contains(s)) {
            return false;
        }

        if self.exclude.iter().any(|s| title.contains(s)) {
            return false;
        }

        match self.regex {
            Some(ref re) => re.is_match(&episode.title),
            None => true,
        }
    }

    /// Keep matching episodes, preserving order.
    pub fn apply(&self, episodes: Vec<Episode>) -> Vec<Episode> {
        episodes.into_iter().filter(|e| self.matches(e)).collect()
    }
}

fn lowercase_all(items: &[String]) -> Vec<String> {
    items.iter().map(|s| s.to_lowercase()).collect()
}

/// Apply a subscription's filters to candidate episodes.
pub fn apply(
    subscription: &Subscription,
    episodes: Vec<Episode>,
) -> Result<Vec<Episode>, FilterError> {
    Ok(FilterRules::from_filters(&subscription.filters)?.apply(episodes))
}
