//! Site configuration (_config.yml)

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::content::DEFAULT_WORDS_PER_MINUTE;
use crate::error::Result;

/// Environment variable overriding `cms.endpoint`
pub const ENDPOINT_ENV: &str = "PRISMIC_API_ENDPOINT";
/// Environment variable overriding `cms.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,

    // Listing
    pub per_page: usize,
    pub date_format: String,
    pub listing_date_field: DateField,

    // Detail
    pub words_per_minute: usize,
    pub revalidate_secs: u64,

    // Content source
    #[serde(default)]
    pub cms: CmsConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            language: "pt-BR".to_string(),
            timezone: "America/Sao_Paulo".to_string(),

            url: "http://localhost:3000".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),

            per_page: 20,
            date_format: "dd MMM yyyy".to_string(),
            listing_date_field: DateField::First,

            words_per_minute: DEFAULT_WORDS_PER_MINUTE,
            revalidate_secs: 60 * 30,

            cms: CmsConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `PRISMIC_API_ENDPOINT` / `PRISMIC_ACCESS_TOKEN` if set
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENDPOINT_ENV).ok(),
            std::env::var(ACCESS_TOKEN_ENV).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            tracing::debug!("CMS endpoint overridden from environment");
            self.cms.endpoint = endpoint;
        }
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.cms.access_token = Some(token);
        }
    }

    /// How long a rendered post stays fresh
    pub fn revalidate_window(&self) -> Duration {
        Duration::from_secs(self.revalidate_secs)
    }
}

/// Which CMS timestamp is shown as the publication date of a listed post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateField {
    First,
    Last,
}

impl DateField {
    /// Name of the field in the raw CMS document
    pub fn as_str(&self) -> &'static str {
        match self {
            DateField::First => "first_publication_date",
            DateField::Last => "last_publication_date",
        }
    }
}

/// Headless CMS connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// API root, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,
    /// Seconds a resolved master ref is reused; every publish creates a new one
    pub ref_ttl_secs: u64,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "post".to_string(),
            ref_ttl_secs: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.per_page, 20);
        assert_eq!(config.revalidate_window(), Duration::from_secs(1800));
        assert_eq!(config.words_per_minute, 200);
        assert_eq!(config.listing_date_field, DateField::First);
        assert_eq!(config.cms.document_type, "post");
        assert_eq!(config.cms.ref_ttl_secs, 5);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
per_page: 5
listing_date_field: last
cms:
  endpoint: https://blog.cdn.prismic.io/api/v2
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.per_page, 5);
        assert_eq!(config.listing_date_field, DateField::Last);
        assert_eq!(config.cms.endpoint, "https://blog.cdn.prismic.io/api/v2");
        assert_eq!(config.cms.document_type, "post");
        assert_eq!(config.timezone, "America/Sao_Paulo");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SiteConfig::default();
        config.apply_overrides(
            Some("https://other.cdn.prismic.io/api/v2".to_string()),
            Some(String::new()),
        );
        assert_eq!(config.cms.endpoint, "https://other.cdn.prismic.io/api/v2");
        assert_eq!(config.cms.access_token, None);
    }
}
