//! Revalidation cache for rendered pages
//!
//! Records when each route was last rendered from CMS data, so pages can be
//! served as-is inside the revalidation window and refreshed after it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

/// Cache directory, relative to the site root
pub const CACHE_DIR: &str = ".spacetraveling-cache";
const CACHE_FILE: &str = "db.json";

/// A rendered route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Hash of the rendered HTML
    pub content_hash: u64,
    pub generated_at: DateTime<Utc>,
    /// Output file relative to the public dir
    pub output_path: String,
}

/// How a cached route compares to the revalidation window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Missing,
    Fresh,
    Stale,
}

/// Cache database, keyed by route (`/`, `post/<uid>/`)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheDb {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
}

impl CacheDb {
    /// Current cache format version
    const VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }

    fn path(base_dir: &Path) -> PathBuf {
        base_dir.join(CACHE_DIR).join(CACHE_FILE)
    }

    /// Load cache from disk, or start empty
    pub fn load(base_dir: &Path) -> Self {
        let cache_path = Self::path(base_dir);
        if let Ok(content) = fs::read_to_string(&cache_path) {
            match serde_json::from_str::<CacheDb>(&content) {
                Ok(cache) if cache.version == Self::VERSION => return cache,
                Ok(_) => tracing::info!("Cache version mismatch, starting fresh"),
                Err(e) => tracing::warn!("Ignoring unreadable cache {:?}: {}", cache_path, e),
            }
        }
        Self::new()
    }

    pub fn save(&self, base_dir: &Path) -> Result<()> {
        fs::create_dir_all(base_dir.join(CACHE_DIR))?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(Self::path(base_dir), content)?;
        Ok(())
    }

    /// Note that `route` was just rendered; returns whether the HTML changed
    pub fn record(&mut self, route: &str, html: &str, output_path: &str, now: DateTime<Utc>) -> bool {
        let content_hash = hash_content(html);
        let changed = self
            .entries
            .get(route)
            .map_or(true, |e| e.content_hash != content_hash);

        self.entries.insert(
            route.to_string(),
            CacheEntry {
                content_hash,
                generated_at: now,
                output_path: output_path.to_string(),
            },
        );
        changed
    }

    pub fn freshness(&self, route: &str, now: DateTime<Utc>, window: Duration) -> Freshness {
        match self.entries.get(route) {
            None => Freshness::Missing,
            Some(entry) => {
                let age = now.signed_duration_since(entry.generated_at);
                match chrono::Duration::from_std(window) {
                    Ok(window) if age < window => Freshness::Fresh,
                    Ok(_) => Freshness::Stale,
                    Err(_) => Freshness::Fresh,
                }
            }
        }
    }

    pub fn remove(&mut self, route: &str) -> Option<CacheEntry> {
        self.entries.remove(route)
    }
}

/// Calculate a hash for content
pub fn hash_content(content: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}
