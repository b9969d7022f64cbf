//! Renders a [`Record`] into an article page. See [`Renderer::to_value`] for
//! the fields available to the article template.

use crate::escape;
use crate::record::Record;
use crate::theme;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use gtmpl::{Template, Value};
use std::collections::HashMap;
use url::Url;

/// Produces the meta description used when a record has none: the title and
/// key phrase wrapped in boilerplate, cut to `limit` characters.
pub fn generate_description(keyword: &str, title: &str, limit: usize) -> String {
    format!(
        "{}. A detailed guide: what it is, how it works, and step-by-step instructions. \
         Key phrase: {}.",
        title, keyword
    )
    .chars()
    .take(limit)
    .collect()
}

/// The file name for the article keyed by `slug`.
pub fn file_name(slug: &str) -> String {
    format!("{}.html", slug)
}

/// Templates article pages.
pub struct Renderer<'a> {
    /// The article template.
    pub template: &'a Template,

    /// The site's home page. Made available to the template, typically as the
    /// destination of a "home" link.
    pub home_page: &'a Url,

    /// The base URL for articles. An article's URL is
    /// `{articles_url}{slug}.html`.
    pub articles_url: &'a Url,

    /// The URL of the "all articles" listing.
    pub listing_url: &'a Url,

    /// The length generated descriptions are cut to.
    pub description_length: usize,
}

impl Renderer<'_> {
    /// The URL of the article for `record`.
    pub fn url(&self, record: &Record) -> Result<Url, url::ParseError> {
        self.articles_url.join(&file_name(&record.slug))
    }

    /// Converts a [`Record`] into a template [`Value`]. The result is a
    /// [`Value::Object`] with these fields, all HTML-escaped:
    ///
    /// * `title`: the page title and heading
    /// * `keyword`: the key phrase
    /// * `slug`: the normalized identifier
    /// * `description`: the record's description or a generated one
    /// * `url`: the article's canonical URL
    /// * `updated`: the render date as `dd.mm.yyyy`
    /// * `modified`: the render time as RFC 3339
    /// * `year`: the render year
    /// * `home_page`, `listing_url`: site navigation URLs
    pub fn to_value(
        &self,
        record: &Record,
        now: &DateTime<FixedOffset>,
    ) -> Result<Value, url::ParseError> {
        let description = match &record.description {
            Some(description) => description.clone(),
            None => generate_description(&record.keyword, &record.title, self.description_length),
        };

        let mut m: HashMap<String, Value> = HashMap::new();
        let mut insert = |key: &str, value: String| {
            m.insert(key.to_owned(), Value::String(value));
        };
        insert("title", escape::html(&record.title));
        insert("keyword", escape::html(&record.keyword));
        insert("slug", record.slug.clone());
        insert("description", escape::html(&description));
        insert("url", escape::href(self.url(record)?.as_str()));
        insert("updated", now.format("%d.%m.%Y").to_string());
        insert("modified", now.to_rfc3339_opts(SecondsFormat::Secs, false));
        insert("year", now.format("%Y").to_string());
        insert("home_page", escape::href(self.home_page.as_str()));
        insert("listing_url", escape::href(self.listing_url.as_str()));
        Ok(Value::Object(m))
    }

    /// Renders the article page for `record` as of `now`.
    pub fn render(&self, record: &Record, now: &DateTime<FixedOffset>) -> Result<String, Error> {
        let value = self.to_value(record, now)?;
        Ok(theme::execute(self.template, value)?)
    }
}

/// Represents a problem rendering an article.
#[derive(Debug)]
pub enum Error {
    /// Returned when the article URL can't be built.
    UrlParse(url::ParseError),

    /// Returned when the template fails to execute.
    Template(theme::Error),
}

impl std::fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::UrlParse(err) => err.fmt(f),
            Error::Template(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::UrlParse(err) => Some(err),
            Error::Template(err) => Some(err),
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<theme::Error> for Error {
    fn from(err: theme::Error) -> Error {
        Error::Template(err)
    }
}
