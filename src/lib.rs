//! spacetraveling: a static blog front-end for a headless CMS
//!
//! Posts live in a Prismic-style document store. The listing page and every
//! post page are rendered to static HTML with Tera templates; the listing
//! grows page by page through the CMS cursor, and post pages unknown at
//! build time are rendered on first request and revalidated periodically.

pub mod cache;
pub mod cms;
pub mod commands;
pub mod config;
pub mod content;
pub mod detail;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod listing;
pub mod paths;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cms::{CmsClient, PrismicClient};

/// The site: configuration, output location and the CMS it reads from
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Document source
    pub cms: Arc<dyn CmsClient>,
}

impl Blog {
    /// Create a blog from a directory, talking to the configured CMS
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let config = Self::load_config(base_dir.as_ref())?;
        let client = PrismicClient::new(&config.cms)?;
        tracing::debug!("Using {:?}", client);
        Ok(Self::with_client(base_dir, config, Arc::new(client)))
    }

    /// Create a blog over an existing client
    pub fn with_client<P: AsRef<Path>>(
        base_dir: P,
        config: config::SiteConfig,
        cms: Arc<dyn CmsClient>,
    ) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let public_dir = base_dir.join(&config.public_dir);

        Self {
            config,
            base_dir,
            public_dir,
            cms,
        }
    }

    /// Read `_config.yml` (defaults if absent) and apply environment overrides
    pub fn load_config(base_dir: &Path) -> Result<config::SiteConfig> {
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Generate the static site
    pub async fn generate(&self) -> Result<()> {
        commands::generate::run(self).await
    }
}
