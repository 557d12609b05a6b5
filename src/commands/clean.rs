//! Clean the public directory

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::cache::CACHE_DIR;
use crate::config::SiteConfig;

/// Remove generated pages and the revalidation cache
///
/// Takes the config rather than a `Blog` so it works without CMS settings.
pub fn run(base_dir: &Path, config: &SiteConfig) -> Result<()> {
    let public_dir = base_dir.join(&config.public_dir);
    if public_dir.exists() {
        fs::remove_dir_all(&public_dir)?;
        tracing::info!("Deleted: {:?}", public_dir);
    }

    let cache_dir = base_dir.join(CACHE_DIR);
    if cache_dir.exists() {
        fs::remove_dir_all(&cache_dir)?;
        tracing::info!("Deleted: {:?}", cache_dir);
    }

    Ok(())
}
