//! Generator module - renders CMS content into static HTML files

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use tera::Context;

use crate::cache::CacheDb;
use crate::detail::{load_post, DetailView};
use crate::error::Result;
use crate::helpers::{full_url_for, html_escape, post_path, truncate, url_for, DateFormatter};
use crate::i18n::I18n;
use crate::listing::{fetch_first_page, listing_query, ListingProps, PaginationState};
use crate::paths::enumerate_paths;
use crate::templates::{
    ConfigData, PostCardData, PostPageData, SectionData, TemplateRenderer, STYLESHEET,
};
use crate::Blog;

/// Seconds before the loading placeholder asks the browser to retry
const PLACEHOLDER_REFRESH_SECS: u32 = 5;

/// Rendered HTML plus the status it should be served with
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub view: DetailView,
    pub html: String,
}

impl RenderedPage {
    /// Only complete posts are written to disk and cached
    pub fn is_cacheable(&self) -> bool {
        matches!(self.view, DetailView::Ready(_))
    }
}

/// What a full build produced
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GenerateReport {
    pub listed: usize,
    pub has_more: bool,
    pub rendered: usize,
    /// Enumerated posts left to the on-demand fallback
    pub deferred: Vec<String>,
}

/// Static site generator using Tera templates
pub struct Generator {
    blog: Blog,
    renderer: TemplateRenderer,
    i18n: I18n,
    formatter: DateFormatter,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        let renderer = TemplateRenderer::new()?;
        let mut i18n = I18n::new(&blog.config.language);
        i18n.load_languages(blog.base_dir.join("languages"))?;

        Ok(Self {
            blog: blog.clone(),
            renderer,
            i18n,
            formatter: DateFormatter::from_config(&blog.config),
        })
    }

    /// Generate the entire site
    pub async fn generate(&self, cache: &mut CacheDb) -> Result<GenerateReport> {
        let config = &self.blog.config;
        let cms = self.blog.cms.as_ref();

        fs::create_dir_all(&self.blog.public_dir)?;
        fs::write(self.blog.public_dir.join("styles.css"), STYLESHEET)?;

        let paths =
            enumerate_paths(cms, &config.cms.document_type, config.revalidate_window()).await?;

        // Listing page
        let state = fetch_first_page(
            cms,
            &listing_query(config),
            &self.formatter,
            config.listing_date_field,
        )
        .await?;
        let html = self.render_listing(&state)?;
        let output = self.write_page("", &html)?;
        cache.record("/", &html, &output, Utc::now());

        let props = ListingProps {
            posts_pagination: state,
        };
        fs::write(
            self.blog.public_dir.join("posts.json"),
            serde_json::to_string_pretty(&props)?,
        )?;

        let mut report = GenerateReport {
            listed: props.posts_pagination.results.len(),
            has_more: props.posts_pagination.next_page.is_some(),
            ..Default::default()
        };

        // Post pages, one after another
        for path in &paths.paths {
            let page = self.render_post(&path.slug).await?;
            if page.is_cacheable() {
                let route = post_path(&path.slug);
                let output = self.write_page(&route, &page.html)?;
                cache.record(&route, &page.html, &output, Utc::now());
                report.rendered += 1;
                tracing::debug!("Generated post: {}", output);
            } else {
                tracing::warn!("Deferring post {} to on-demand rendering", path.slug);
                report.deferred.push(path.slug.clone());
            }
        }

        tracing::info!(
            "Generated listing ({} posts) and {} post pages",
            report.listed,
            report.rendered
        );
        Ok(report)
    }

    /// Fetch one post and render whatever state it is in
    pub async fn render_post(&self, uid: &str) -> Result<RenderedPage> {
        let view = load_post(
            self.blog.cms.as_ref(),
            &self.blog.config.cms.document_type,
            uid,
        )
        .await;
        let html = self.render_detail(&view)?;
        Ok(RenderedPage { view, html })
    }

    /// Create a base context with common variables
    fn create_base_context(&self) -> Context {
        let config = &self.blog.config;
        let mut context = Context::new();
        context.insert(
            "config",
            &ConfigData {
                title: config.title.clone(),
                language: self.i18n.language().to_string(),
                root: html_escape(&url_for(config, "")),
                url: config.url.clone(),
            },
        );
        context.insert("t", &self.i18n.get_all_translations());
        context
    }

    /// Render the listing page for the given initial state
    pub fn render_listing(&self, state: &PaginationState) -> Result<String> {
        let cards: Vec<PostCardData> = state
            .results
            .iter()
            .map(|post| PostCardData {
                href: html_escape(&url_for(&self.blog.config, &post_path(&post.uid))),
                title: post.data.title.clone(),
                subtitle: post.data.subtitle.clone(),
                author: post.data.author.clone(),
                date: post.first_publication_date.clone(),
            })
            .collect();

        let mut context = self.create_base_context();
        context.insert("posts", &cards);
        context.insert("next_page", &state.next_page);
        self.renderer.render("index.html", &context)
    }

    /// Render a post page, or the placeholder/error page for its state
    ///
    /// The date formatter only runs for a post that has a publication date.
    pub fn render_detail(&self, view: &DetailView) -> Result<String> {
        let post = match view {
            DetailView::Ready(post) => post,
            DetailView::Loading => {
                return self.render_message(&self.i18n.get("loading"), Some(PLACEHOLDER_REFRESH_SECS))
            }
            DetailView::NotFound(_) => return self.render_message(&self.i18n.get("not_found"), None),
            DetailView::Failed(_) => {
                return self.render_message(&self.i18n.get("post_unavailable"), None)
            }
        };

        let Some(published) = post.first_publication_date else {
            return self.render_message(&self.i18n.get("loading"), Some(PLACEHOLDER_REFRESH_SECS));
        };

        let description = if post.subtitle.is_empty() {
            truncate(&post.plain_text(), 160, None)
        } else {
            post.subtitle.clone()
        };

        let data = PostPageData {
            uid: post.uid.clone(),
            canonical_url: html_escape(&full_url_for(&self.blog.config, &post_path(&post.uid))),
            title: post.title.clone(),
            description,
            author: post.author.clone(),
            banner_url: post.banner_url.clone(),
            date: self.formatter.format(&published),
            datetime: published.to_rfc3339(),
            reading_time: post.reading_time(self.blog.config.words_per_minute),
            sections: post
                .content
                .iter()
                .enumerate()
                .map(|(i, section)| SectionData {
                    key: section.key(i),
                    heading: section.heading.clone(),
                    html: section.html(),
                })
                .collect(),
        };

        let mut context = self.create_base_context();
        context.insert("post", &data);
        self.renderer.render("post.html", &context)
    }

    fn render_message(&self, heading: &str, refresh_secs: Option<u32>) -> Result<String> {
        let mut context = self.create_base_context();
        context.insert("heading", heading);
        context.insert("refresh_secs", &refresh_secs);
        context.insert("show_home_link", &refresh_secs.is_none());
        self.renderer.render("message.html", &context)
    }

    /// Write `html` as `<route>/index.html`, returning the path relative to
    /// the public dir
    pub fn write_page(&self, route: &str, html: &str) -> Result<String> {
        let relative = PathBuf::from(route.trim_matches('/')).join("index.html");
        let output_path = self.blog.public_dir.join(&relative);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&output_path, html)?;
        Ok(relative.to_string_lossy().replace('\\', "/"))
    }

    /// Remove a previously written page
    pub fn remove_page(&self, route: &str) -> Result<()> {
        let dir = self.blog.public_dir.join(route.trim_matches('/'));
        if dir.join("index.html").exists() {
            fs::remove_file(dir.join("index.html"))?;
            tracing::info!("Removed {:?}", dir);
        }
        Ok(())
    }
}
