//! Full post model and reading-time estimate

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use super::richtext;
use crate::cms::{RawDocument, RichTextBlock};
use crate::error::{BlogError, Result};
use crate::helpers::parse_cms_date;

/// Average adult reading speed
pub const DEFAULT_WORDS_PER_MINUTE: usize = 200;

/// A post with its full content
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetail {
    pub uid: String,
    /// `None` while the CMS has not published the document yet
    pub first_publication_date: Option<DateTime<FixedOffset>>,
    pub title: String,
    pub subtitle: String,
    pub banner_url: Option<String>,
    pub author: String,
    pub content: Vec<ContentSection>,
}

/// One heading plus its rich-text body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentSection {
    pub heading: String,
    pub body: Vec<RichTextBlock>,
}

impl ContentSection {
    /// Words in the heading and body
    pub fn word_count(&self) -> usize {
        let text = format!("{} {}", self.heading, richtext::as_text(&self.body));
        text.split_whitespace().count()
    }

    pub fn html(&self) -> String {
        richtext::as_html(&self.body)
    }

    /// Render key that stays the same across re-renders of the same post
    pub fn key(&self, index: usize) -> String {
        let slug = slug::slugify(&self.heading);
        if slug.is_empty() {
            format!("section-{}", index)
        } else {
            format!("section-{}-{}", index, slug)
        }
    }
}

impl PostDetail {
    /// Build the detail view model from a raw CMS document
    ///
    /// A null publication date is kept as `None`; a malformed one is an error.
    pub fn from_document(doc: &RawDocument) -> Result<Self> {
        let first_publication_date = match doc.first_publication_date.as_deref() {
            None => None,
            Some(raw) => Some(parse_cms_date(raw).ok_or_else(|| BlogError::Format {
                field: "first_publication_date",
                value: Some(raw.to_string()),
            })?),
        };

        let content = doc
            .data
            .content
            .iter()
            .map(|section| ContentSection {
                heading: section.heading.clone().unwrap_or_default(),
                body: section.body.clone(),
            })
            .collect();

        Ok(Self {
            uid: doc.uid.clone().unwrap_or_default(),
            first_publication_date,
            title: doc.data.title.clone().unwrap_or_default(),
            subtitle: doc.data.subtitle.clone().unwrap_or_default(),
            banner_url: doc.data.banner.as_ref().and_then(|b| b.url.clone()),
            author: doc.data.author.clone().unwrap_or_default(),
            content,
        })
    }

    /// Total words across all sections
    pub fn word_count(&self) -> usize {
        self.content.iter().map(ContentSection::word_count).sum()
    }

    /// Estimated minutes to read the post
    pub fn reading_time(&self, words_per_minute: usize) -> u32 {
        reading_time(self.word_count(), words_per_minute)
    }

    /// Plain text of the whole post, for descriptions
    pub fn plain_text(&self) -> String {
        self.content
            .iter()
            .map(|s| richtext::as_text(&s.body))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `ceil(words / words_per_minute)`; zero words take zero minutes
pub fn reading_time(words: usize, words_per_minute: usize) -> u32 {
    words.div_ceil(words_per_minute.max(1)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::{Banner, RawSection};

    fn section(heading: &str, body: &str) -> RawSection {
        RawSection {
            heading: Some(heading.to_string()),
            body: vec![RichTextBlock::paragraph(body)],
        }
    }

    fn doc(sections: Vec<RawSection>) -> RawDocument {
        let mut doc = RawDocument {
            uid: Some("post".to_string()),
            first_publication_date: Some("2021-03-25T19:25:28+0000".to_string()),
            ..Default::default()
        };
        doc.data.title = Some("Criando um app CRA do zero".to_string());
        doc.data.banner = Some(Banner {
            url: Some("https://images.prismic.io/banner.png".to_string()),
            alt: None,
        });
        doc.data.content = sections;
        doc
    }

    #[test]
    fn test_two_hundred_words_is_one_minute() {
        let post = PostDetail::from_document(&doc(vec![section("Intro", &"word ".repeat(199))]))
            .unwrap();
        assert_eq!(post.word_count(), 200);
        assert_eq!(post.reading_time(DEFAULT_WORDS_PER_MINUTE), 1);
    }

    #[test]
    fn test_one_more_word_rounds_up() {
        let post = PostDetail::from_document(&doc(vec![section("Intro", &"word ".repeat(200))]))
            .unwrap();
        assert_eq!(post.word_count(), 201);
        assert_eq!(post.reading_time(DEFAULT_WORDS_PER_MINUTE), 2);
    }

    #[test]
    fn test_words_summed_across_sections_and_blocks() {
        let mut second = section("Dois", "um dois");
        second.body.push(RichTextBlock::paragraph("três\nquatro"));
        let post = PostDetail::from_document(&doc(vec![section("Um", "a b c"), second])).unwrap();
        // "Um a b c" + "Dois um dois três quatro"
        assert_eq!(post.word_count(), 9);
    }

    #[test]
    fn test_reading_time_bounds() {
        assert_eq!(reading_time(0, 200), 0);
        assert_eq!(reading_time(1, 200), 1);
        assert_eq!(reading_time(400, 200), 2);
        assert_eq!(reading_time(10, 0), 10);

        let mut previous = 0;
        for words in 0..1000 {
            let minutes = reading_time(words, 200);
            assert!(minutes >= previous);
            previous = minutes;
        }
    }

    #[test]
    fn test_from_document_fields() {
        let post = PostDetail::from_document(&doc(vec![section("Intro", "Hello")])).unwrap();
        assert_eq!(post.title, "Criando um app CRA do zero");
        assert_eq!(
            post.banner_url.as_deref(),
            Some("https://images.prismic.io/banner.png")
        );
        assert!(post.first_publication_date.is_some());
        assert_eq!(post.content[0].html(), "<p>Hello</p>");
    }

    #[test]
    fn test_null_date_is_kept() {
        let mut raw = doc(vec![]);
        raw.first_publication_date = None;
        let post = PostDetail::from_document(&raw).unwrap();
        assert_eq!(post.first_publication_date, None);
    }

    #[test]
    fn test_malformed_date_is_error() {
        let mut raw = doc(vec![]);
        raw.first_publication_date = Some("not a date".to_string());
        assert!(matches!(
            PostDetail::from_document(&raw),
            Err(BlogError::Format { .. })
        ));
    }

    #[test]
    fn test_section_keys_are_stable() {
        let post = PostDetail::from_document(&doc(vec![
            section("Proin et varius", "x"),
            section("", "y"),
        ]))
        .unwrap();
        assert_eq!(post.content[0].key(0), "section-0-proin-et-varius");
        assert_eq!(post.content[1].key(1), "section-1");
        assert_eq!(post.content[0].key(0), post.content[0].key(0));
    }
}
