//! Location of the on-disk quote and indicator cache.

use std::path::PathBuf;
use tasman_data::DataError;
use tasman_data::cache::SqliteCache;

/// Platform cache directory for tasman.
///
/// - Linux: `~/.cache/tasman/`
/// - macOS: `~/Library/Caches/tasman/`
/// - Windows: `%LOCALAPPDATA%\tasman\`
pub(crate) fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tasman")
}

/// Path of the cache database.
pub(crate) fn cache_path() -> PathBuf {
    default_cache_dir().join("tasman.db")
}

/// Open the cache, creating its directory if needed.
pub(crate) fn open_cache() -> Result<SqliteCache, DataError> {
    let path = cache_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    SqliteCache::new(&path)
}
