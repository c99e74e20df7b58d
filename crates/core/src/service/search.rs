//! Episode search outside of subscriptions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CommandResult, SubscriptionService};
use crate::episode::{Episode, EpisodeSearch};
use crate::error::CommandError;
use crate::filter::{dedup_first, EpisodeBounds, FilterRules};
use crate::metrics;

/// Search parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub keyword: String,
    /// Maximum pages to read. Defaults to the configured `max_pages`.
    #[serde(default)]
    pub count: Option<u32>,
    #[serde(default)]
    pub regex: Option<String>,
    /// Keep every release instead of one per episode number.
    #[serde(default)]
    pub dupe: bool,
    #[serde(default)]
    pub min_episode: Option<u32>,
    #[serde(default)]
    pub max_episode: Option<u32>,
    /// Treat `keyword` as a series tag.
    #[serde(default)]
    pub tag: bool,
    /// Comma-separated subtitle group names for tag searches.
    #[serde(default)]
    pub subtitle: Option<String>,
}

/// Effective search options echoed back with the results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub keyword: String,
    pub count: u32,
    pub regex: Option<String>,
    pub dupe: bool,
    pub min_episode: Option<u32>,
    pub max_episode: Option<u32>,
}

#[derive(Serialize)]
struct SearchData<'a> {
    options: &'a SearchOptions,
    episodes: &'a [Episode],
}

impl SubscriptionService {
    /// Search episodes by keyword or tag.
    ///
    /// Results are narrowed by regex and episode bounds, collapsed to one
    /// release per number unless `dupe` is set, and sorted by episode.
    pub async fn search(&self, request: &SearchRequest) -> Result<CommandResult, CommandError> {
        let options = SearchOptions {
            keyword: request.keyword.clone(),
            count: request.count.unwrap_or(self.config.max_pages),
            regex: request.regex.clone().filter(|r| !r.is_empty()),
            dupe: request.dupe,
            min_episode: request.min_episode,
            max_episode: request.max_episode,
        };
        debug!("search options: {:?}", options);

        let result = self
            .search_episodes(request, &options)
            .await
            .map(|episodes| {
                CommandResult::success(format!("{} episodes found", episodes.len())).with_data(
                    &SearchData {
                        options: &options,
                        episodes: &episodes,
                    },
                )
            });

        match self.respond("search", result)? {
            // Failed searches still echo the options with an empty list
            failed if failed.data.is_none() => Ok(failed.with_data(&SearchData {
                options: &options,
                episodes: &[],
            })),
            result => Ok(result),
        }
    }

    async fn search_episodes(
        &self,
        request: &SearchRequest,
        options: &SearchOptions,
    ) -> Result<Vec<Episode>, CommandError> {
        let rules = match options.regex.as_deref() {
            Some(pattern) => Some(FilterRules::with_regex(pattern)?),
            None => None,
        };

        let query = EpisodeSearch {
            keyword: request.keyword.clone(),
            tag: request.tag,
            subtitle: request.subtitle.clone(),
            max_pages: options.count,
        };

        let found = self.source.search(&query).await;
        let status = if found.is_ok() { "success" } else { "error" };
        metrics::SOURCE_REQUESTS
            .with_label_values(&[self.source.name(), "search", status])
            .inc();

        let mut episodes = found?;
        if let Some(rules) = rules {
            episodes = rules.apply(episodes);
        }
        episodes = EpisodeBounds::new(options.min_episode, options.max_episode).apply(episodes);
        if !options.dupe {
            episodes = dedup_first(episodes);
        }
        episodes.sort_by_key(|e| e.episode);

        Ok(episodes)
    }
}
