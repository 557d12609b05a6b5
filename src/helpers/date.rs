//! Date helper functions

use chrono::{DateTime, FixedOffset, Locale};
use chrono_tz::Tz;

use crate::config::SiteConfig;
use crate::error::{BlogError, Result};

/// Parse a CMS timestamp such as `2021-03-25T19:25:28+0000`
///
/// The CMS omits the colon in the offset, so plain RFC 3339 is only the
/// first attempt.
pub fn parse_cms_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z"))
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
}

/// Formats dates for display in the site's language and timezone
#[derive(Debug, Clone)]
pub struct DateFormatter {
    pattern: String,
    locale: Locale,
    timezone: Tz,
}

impl DateFormatter {
    /// `format` uses date-fns style tokens (`dd MMM yyyy`)
    pub fn new(format: &str, language: &str, timezone: &str) -> Self {
        let timezone = timezone.parse::<Tz>().unwrap_or_else(|_| {
            if !timezone.is_empty() {
                tracing::warn!("Unknown timezone {:?}, falling back to UTC", timezone);
            }
            Tz::UTC
        });

        Self {
            pattern: date_fns_to_chrono_format(format),
            locale: locale_for(language),
            timezone,
        }
    }

    pub fn from_config(config: &SiteConfig) -> Self {
        Self::new(&config.date_format, &config.language, &config.timezone)
    }

    /// Format an already parsed date
    pub fn format(&self, date: &DateTime<FixedOffset>) -> String {
        date.with_timezone(&self.timezone)
            .format_localized(&self.pattern, self.locale)
            .to_string()
    }

    /// Parse and format a raw CMS date field
    pub fn format_field(&self, field: &'static str, value: Option<&str>) -> Result<String> {
        let date = value
            .and_then(parse_cms_date)
            .ok_or_else(|| BlogError::Format {
                field,
                value: value.map(str::to_string),
            })?;
        Ok(self.format(&date))
    }
}

/// Map a language tag from the config to a chrono locale
fn locale_for(language: &str) -> Locale {
    match language.to_ascii_lowercase().replace('_', "-").as_str() {
        "pt-br" | "pt" => Locale::pt_BR,
        "pt-pt" => Locale::pt_PT,
        "en" | "en-us" => Locale::en_US,
        "en-gb" => Locale::en_GB,
        "es" | "es-es" => Locale::es_ES,
        _ => Locale::POSIX,
    }
}

/// Convert a date-fns format string to a chrono one
///
/// Tokens are runs of the same letter; anything else is copied through.
fn date_fns_to_chrono_format(format: &str) -> String {
    let chars: Vec<char> = format.chars().collect();
    let mut result = String::with_capacity(format.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }

        let token = match (c, run) {
            // Calendar year and week-numbering year are treated alike
            ('y' | 'Y', 2) => Some("%y"),
            ('y' | 'Y', _) => Some("%Y"),
            ('M', 1) => Some("%-m"),
            ('M', 2) => Some("%m"),
            ('M', 3) => Some("%b"),
            ('M', _) => Some("%B"),
            ('d', 1) => Some("%-d"),
            ('d', 2) => Some("%d"),
            ('E', 4) => Some("%A"),
            ('E', _) => Some("%a"),
            ('H', 1) => Some("%-H"),
            ('H', _) => Some("%H"),
            ('m', _) => Some("%M"),
            ('s', _) => Some("%S"),
            _ => None,
        };

        match token {
            Some(token) => result.push_str(token),
            None => {
                for _ in 0..run {
                    if c == '%' {
                        result.push_str("%%");
                    } else {
                        result.push(c);
                    }
                }
            }
        }
        i += run;
    }

    result
}
