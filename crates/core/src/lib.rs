pub mod catalog;
pub mod config;
pub mod download;
pub mod episode;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod reconcile;
pub mod scheduler;
pub mod script;
pub mod service;
mod storage;
pub mod subscription;
pub mod testing;

pub use catalog::{CatalogError, CatalogStats, Series, SeriesCatalog, SqliteCatalog, SubtitleGroup};
pub use config::{
    config_path, load_config, load_config_from_str, validate_config, Config, ConfigError,
    DatabaseConfig, RefreshConfig, ServerConfig, CONFIG_PATH_ENV,
};
pub use download::{DownloadError, DownloadStatus, DownloadTask, Downloader, SqliteDownloadQueue};
pub use episode::{Episode, EpisodeSearch, EpisodeSource, SourceError};
pub use error::{CommandError, ErrorKind};
pub use filter::{EpisodeBounds, FilterError, FilterRules};
pub use reconcile::{reconcile, Reconciliation};
pub use scheduler::{RefreshScheduler, SchedulerError, SchedulerStatus};
pub use script::{
    InMemoryScriptRegistry, ScriptError, ScriptRegistry, ScriptedSeries, SqliteScriptRegistry,
};
pub use service::{
    CalendarEntry, CommandResult, FilterRequest, FilterState, RefreshOutcome, RefreshReport,
    RefreshRequest, RefreshTrigger, ResultStatus, ScriptRequest, SearchOptions, SearchRequest,
    SeriesOutcome, SubscriptionService, WeeklyCalendar,
};
pub use subscription::{
    SqliteSubscriptionStore, StoreError, Subscription, SubscriptionFilter, SubscriptionFilters,
    SubscriptionStatus, SubscriptionStore,
};
