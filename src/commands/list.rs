//! List site content

use anyhow::Result;

use crate::helpers::DateFormatter;
use crate::listing::{fetch_first_page, listing_query, PaginationController};
use crate::paths::enumerate_paths;
use crate::Blog;

/// List site content by type
pub async fn run(blog: &Blog, content_type: &str) -> Result<()> {
    let config = &blog.config;
    let cms = blog.cms.as_ref();

    match content_type {
        "post" | "posts" => {
            let formatter = DateFormatter::from_config(config);
            let first =
                fetch_first_page(cms, &listing_query(config), &formatter, config.listing_date_field)
                    .await?;
            let mut controller =
                PaginationController::new(first, formatter, config.listing_date_field);
            controller.drain(cms).await?;

            let posts = controller.into_state().results;
            println!("Posts ({}):", posts.len());
            for post in posts {
                println!(
                    "  {} - {} by {} [{}]",
                    post.first_publication_date, post.data.title, post.data.author, post.uid
                );
            }
        }
        "path" | "paths" => {
            let paths =
                enumerate_paths(cms, &config.cms.document_type, config.revalidate_window()).await?;
            println!(
                "Paths ({}, fallback: {}, revalidate: {}s):",
                paths.paths.len(),
                paths.fallback,
                paths.revalidate.as_secs()
            );
            for path in paths.paths {
                println!("  /post/{}", path.slug);
            }
        }
        _ => {
            anyhow::bail!("Unknown type: {}. Available: post, path", content_type);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::fixtures::post;
    use crate::cms::MemoryCms;
    use crate::config::SiteConfig;
    use std::sync::Arc;

    fn blog(dir: &tempfile::TempDir) -> (Blog, Arc<MemoryCms>) {
        let cms = Arc::new(MemoryCms::new(
            (0..5)
                .map(|i| post(&format!("p{}", i), "2021-03-25T19:25:28+0000"))
                .collect(),
        ));
        let mut config = SiteConfig::default();
        config.per_page = 2;
        (Blog::with_client(dir.path(), config, cms.clone()), cms)
    }

    #[tokio::test]
    async fn test_list_posts_follows_every_page() {
        let dir = tempfile::TempDir::new().unwrap();
        let (blog, cms) = blog(&dir);
        run(&blog, "post").await.unwrap();
        assert_eq!(cms.fetch_count(), 3);
    }

    #[tokio::test]
    async fn test_list_paths_and_unknown_type() {
        let dir = tempfile::TempDir::new().unwrap();
        let (blog, _) = blog(&dir);
        run(&blog, "paths").await.unwrap();
        assert!(run(&blog, "tag").await.is_err());
    }
}
