//! Subscription commands.
//!
//! `SubscriptionService` ties the catalog, episode source, subscription
//! store and download queue together and exposes the command surface
//! (add, filter, delete, mark, status change, search, update, calendar,
//! list, scripted series). Every command returns a [`CommandResult`]; failures are folded
//! into it unless debug mode is on, in which case storage and transport
//! failures come back as `Err`.

mod lifecycle;
mod query;
mod refresh;
mod result;
mod scripts;
mod search;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, warn};

use crate::catalog::SeriesCatalog;
use crate::config::RefreshConfig;
use crate::download::Downloader;
use crate::episode::EpisodeSource;
use crate::error::{CommandError, ErrorKind};
use crate::script::ScriptRegistry;
use crate::subscription::SubscriptionStore;

pub use lifecycle::{FilterRequest, FilterState};
pub use query::{CalendarEntry, WeeklyCalendar};
pub use refresh::{RefreshOutcome, RefreshReport, RefreshRequest, RefreshTrigger, SeriesOutcome};
pub use result::{CommandResult, ResultStatus};
pub use scripts::ScriptRequest;
pub use search::{SearchOptions, SearchRequest};

/// Subscription command service.
pub struct SubscriptionService {
    catalog: Arc<dyn SeriesCatalog>,
    source: Arc<dyn EpisodeSource>,
    store: Arc<dyn SubscriptionStore>,
    downloader: Arc<dyn Downloader>,
    scripts: Option<Arc<dyn ScriptRegistry>>,
    config: RefreshConfig,
    debug: bool,
    /// Serializes subscription writes, including whole refresh cycles.
    write_lock: Mutex<()>,
}

impl SubscriptionService {
    pub fn new(
        catalog: Arc<dyn SeriesCatalog>,
        source: Arc<dyn EpisodeSource>,
        store: Arc<dyn SubscriptionStore>,
        downloader: Arc<dyn Downloader>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            catalog,
            source,
            store,
            downloader,
            scripts: None,
            config,
            debug: false,
            write_lock: Mutex::new(()),
        }
    }

    /// Attach a registry of script-driven series.
    pub fn with_scripts(mut self, scripts: Arc<dyn ScriptRegistry>) -> Self {
        self.scripts = Some(scripts);
        self
    }

    /// Return storage and transport failures as `Err` instead of folding
    /// them into results.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn config(&self) -> &RefreshConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<dyn SeriesCatalog> {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<dyn SubscriptionStore> {
        &self.store
    }

    pub fn downloader(&self) -> &Arc<dyn Downloader> {
        &self.downloader
    }

    /// Fold a command failure into a structured result.
    fn respond(
        &self,
        operation: &str,
        result: Result<CommandResult, CommandError>,
    ) -> Result<CommandResult, CommandError> {
        let err = match result {
            Ok(result) => return Ok(result),
            Err(err) => err,
        };

        match err.kind() {
            ErrorKind::Storage => error!("{} failed: {}", operation, err),
            ErrorKind::Transport => warn!("{} failed: {}", operation, err),
            _ => tracing::debug!("{} rejected: {}", operation, err),
        }

        if self.debug && !err.kind().is_domain() {
            return Err(err);
        }
        Ok(CommandResult::from_error(&err))
    }
}
