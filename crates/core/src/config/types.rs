use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    /// Surface storage and transport failures unmodified instead of
    /// folding them into structured command results.
    #[serde(default)]
    pub debug: bool,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tsuiseki.db")
}

/// Refresh cycle configuration, passed to the subscription service and
/// the scheduler.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefreshConfig {
    /// Run refresh cycles periodically in the background.
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between scheduled refresh cycles.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Maximum number of episode pages requested per series.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Episodes observed longer ago than this are skipped by the source
    /// when old rows are ignored.
    #[serde(default = "default_ignore_old_days")]
    pub ignore_old_days: u32,

    /// How long the "updated" badge lasts before reverting to followed.
    #[serde(default = "default_staleness_hours")]
    pub staleness_hours: u32,

    /// Enqueue download tasks during scheduled cycles.
    #[serde(default = "default_true")]
    pub download: bool,

    /// Skip already-seen episode numbers during scheduled cycles.
    #[serde(default = "default_true")]
    pub ignore_old: bool,
}

fn default_interval() -> u64 {
    3600 // 1 hour
}

fn default_max_pages() -> u32 {
    3
}

fn default_ignore_old_days() -> u32 {
    30
}

fn default_staleness_hours() -> u32 {
    24
}

fn default_true() -> bool {
    true
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval(),
            max_pages: default_max_pages(),
            ignore_old_days: default_ignore_old_days(),
            staleness_hours: default_staleness_hours(),
            download: true,
            ignore_old: true,
        }
    }
}
