//! Built-in site templates using the Tera template engine
//!
//! Templates are embedded in the binary. Autoescaping stays on for `.html`
//! templates since every string comes from the CMS; pre-rendered rich text
//! is marked `safe` where it is inserted.

use serde::Serialize;
use tera::{Context, Tera};

use crate::error::Result;

/// Stylesheet written next to the generated pages
pub const STYLESHEET: &str = include_str!("site/styles.css");

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("index.html", include_str!("site/index.html")),
            ("post.html", include_str!("site/post.html")),
            ("message.html", include_str!("site/message.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("site/partials/header.html"),
            ),
            (
                "partials/post_card.html",
                include_str!("site/partials/post_card.html"),
            ),
        ])?;

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct ConfigData {
    pub title: String,
    pub language: String,
    /// Pre-escaped site root
    pub root: String,
    pub url: String,
}

/// A post on the listing page
#[derive(Debug, Clone, Serialize)]
pub struct PostCardData {
    /// Pre-escaped link to the post page
    pub href: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: String,
}

/// A full post page
#[derive(Debug, Clone, Serialize)]
pub struct PostPageData {
    pub uid: String,
    /// Pre-escaped absolute URL of the page
    pub canonical_url: String,
    pub title: String,
    pub description: String,
    pub author: String,
    pub banner_url: Option<String>,
    /// Display date
    pub date: String,
    /// Machine-readable date for `<time datetime>`
    pub datetime: String,
    pub reading_time: u32,
    pub sections: Vec<SectionData>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SectionData {
    /// Stable element id
    pub key: String,
    pub heading: String,
    /// Rendered rich text
    pub html: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn context() -> Context {
        let mut context = Context::new();
        context.insert(
            "config",
            &ConfigData {
                title: "spacetraveling".to_string(),
                language: "pt-BR".to_string(),
                root: "/".to_string(),
                url: "http://localhost:3000".to_string(),
            },
        );
        let t: HashMap<&str, &str> = [
            ("posts_title", "Posts"),
            ("load_more", "Carregar mais posts"),
            ("load_more_failed", "Erro"),
            ("reading_time_unit", "min"),
            ("back_home", "Voltar"),
        ]
        .into_iter()
        .collect();
        context.insert("t", &t);
        context
    }

    #[test]
    fn test_templates_parse() {
        assert!(TemplateRenderer::new().is_ok());
    }

    #[test]
    fn test_index_escapes_cms_text() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = context();
        context.insert(
            "posts",
            &vec![PostCardData {
                href: "/post/a/".to_string(),
                title: "<script>alert(1)</script>".to_string(),
                subtitle: String::new(),
                author: "Ana".to_string(),
                date: "25 mar 2021".to_string(),
            }],
        );
        context.insert("next_page", &Option::<String>::None);

        let html = renderer.render("index.html", &context).unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains(r#"href="/post/a/""#));
        assert!(!html.contains("Carregar mais posts"));
    }

    #[test]
    fn test_message_page() {
        let renderer = TemplateRenderer::new().unwrap();
        let mut context = context();
        context.insert("heading", "Carregando...");
        context.insert("refresh_secs", &5);
        context.insert("show_home_link", &false);

        let html = renderer.render("message.html", &context).unwrap();
        assert!(html.contains("<h1>Carregando...</h1>"));
        assert!(html.contains(r#"http-equiv="refresh" content="5""#));
    }
}
