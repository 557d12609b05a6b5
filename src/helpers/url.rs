//! URL helper functions

use crate::config::SiteConfig;

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/post/hello/") // -> "/blog/post/hello/"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Generate a full URL including the domain
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    format!("{}{}", base, url_for(config, path))
}

/// Site-relative path of a post page
pub fn post_path(uid: &str) -> String {
    format!("post/{}/", uid)
}

/// A UID is served only if it is already a slug, so it maps 1:1 onto a
/// directory under the output folder
pub fn is_safe_uid(uid: &str) -> bool {
    !uid.is_empty() && slug::slugify(uid) == uid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SiteConfig {
        let mut config = SiteConfig::default();
        config.url = "https://example.com/".to_string();
        config.root = "/blog/".to_string();
        config
    }

    #[test]
    fn test_url_for() {
        let config = test_config();
        assert_eq!(url_for(&config, "/styles.css"), "/blog/styles.css");
        assert_eq!(url_for(&config, &post_path("hello")), "/blog/post/hello/");
        assert_eq!(url_for(&config, ""), "/blog/");
    }

    #[test]
    fn test_full_url_for() {
        let config = test_config();
        assert_eq!(
            full_url_for(&config, "/post/hello/"),
            "https://example.com/blog/post/hello/"
        );
    }

    #[test]
    fn test_is_safe_uid() {
        assert!(is_safe_uid("como-utilizar-hooks"));
        assert!(!is_safe_uid("../etc/passwd"));
        assert!(!is_safe_uid("Upper Case"));
        assert!(!is_safe_uid(""));
    }
}
