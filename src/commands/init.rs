//! Initialize a new site

use anyhow::Result;
use std::fs;
use std::path::Path;

/// Default `_config.yml` written by `init`
const DEFAULT_CONFIG: &str = r#"# spacetraveling configuration

# Site
title: spacetraveling
language: pt-BR
timezone: America/Sao_Paulo

# URL
url: http://localhost:3000
root: /

# Directory
public_dir: public

# Listing
per_page: 20
date_format: dd MMM yyyy
# first | last
listing_date_field: first

# Post pages
words_per_minute: 200
revalidate_secs: 1800

# Content source
# PRISMIC_API_ENDPOINT and PRISMIC_ACCESS_TOKEN override these
cms:
  endpoint: ''
  access_token:
  document_type: post
  # seconds a resolved master ref is reused before asking the API again
  ref_ttl_secs: 5
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir)?;
    fs::create_dir_all(target_dir.join("languages"))?;

    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        anyhow::bail!("{:?} already exists", config_path);
    }
    fs::write(&config_path, DEFAULT_CONFIG)?;
    tracing::info!("Created {:?}", config_path);

    let gitignore = target_dir.join(".gitignore");
    if !gitignore.exists() {
        fs::write(&gitignore, "public/\n.spacetraveling-cache/\n.env\n")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DateField, SiteConfig};
    use tempfile::TempDir;

    #[test]
    fn test_default_config_matches_defaults() {
        let dir = TempDir::new().unwrap();
        init_site(dir.path()).unwrap();

        let config = SiteConfig::load(dir.path().join("_config.yml")).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(config.per_page, defaults.per_page);
        assert_eq!(config.date_format, defaults.date_format);
        assert_eq!(config.listing_date_field, DateField::First);
        assert_eq!(config.revalidate_secs, 1800);
        assert_eq!(config.cms.document_type, "post");
        assert_eq!(config.cms.ref_ttl_secs, 5);
        assert!(config.cms.access_token.is_none());
        assert!(dir.path().join("languages").is_dir());
    }

    #[test]
    fn test_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("_config.yml"), "title: mine\n").unwrap();
        assert!(init_site(dir.path()).is_err());
        assert_eq!(
            fs::read_to_string(dir.path().join("_config.yml")).unwrap(),
            "title: mine\n"
        );
    }
}
