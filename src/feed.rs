//! Support for creating Atom feeds from a list of published documents.

use crate::config::Author;
use crate::scan::Document;
use atom_syndication::{Entry, Error as AtomError, Feed, Link, Person, Text};
use chrono::{DateTime, FixedOffset, Utc};
use std::fmt;
use std::io::Write;
use url::Url;

/// Bundled configuration for creating a feed.
pub struct FeedConfig {
    pub title: String,
    pub subtitle: Option<String>,
    pub author: Option<Author>,
    pub home_page: Url,

    /// The maximum number of entries.
    pub size: usize,
}

/// Creates a feed from some configuration ([`FeedConfig`]) and a list of
/// [`Document`]s, which must already be sorted newest first, and writes the
/// result to a [`std::io::Write`].
pub fn write_feed<W: Write>(config: &FeedConfig, documents: &[Document], w: W) -> Result<()> {
    feed(config, documents).write_to(w)?;
    Ok(())
}

/// Builds the feed. Only the first [`FeedConfig::size`] documents are
/// included. The feed's `updated` time is that of the newest document, or now
/// if there are none.
pub fn feed(config: &FeedConfig, documents: &[Document]) -> Feed {
    let documents = &documents[..documents.len().min(config.size)];
    let updated = documents
        .first()
        .map(|d| d.modified)
        .unwrap_or_else(|| DateTime::<FixedOffset>::from(Utc::now()));

    let mut feed = Feed::default();
    feed.set_title(config.title.as_str());
    feed.set_subtitle(config.subtitle.as_ref().map(|s| Text::plain(s.as_str())));
    feed.set_id(config.home_page.as_str());
    feed.set_updated(updated);
    feed.set_authors(author_to_people(config.author.as_ref()));
    feed.set_links(vec![alternate(config.home_page.as_str())]);
    feed.set_entries(
        documents
            .iter()
            .map(|d| entry(config, d))
            .collect::<Vec<Entry>>(),
    );
    feed
}

fn entry(config: &FeedConfig, document: &Document) -> Entry {
    let mut entry = Entry::default();
    entry.set_id(document.url.as_str());
    entry.set_title(document.title.as_str());
    entry.set_updated(document.modified);
    entry.set_published(Some(document.modified));
    entry.set_authors(author_to_people(config.author.as_ref()));
    entry.set_links(vec![alternate(document.url.as_str())]);
    entry.set_summary(
        document
            .description
            .as_ref()
            .map(|d| Text::plain(d.as_str())),
    );
    entry
}

fn alternate(href: &str) -> Link {
    let mut link = Link::default();
    link.set_href(href);
    link.set_rel("alternate");
    link
}

fn author_to_people(author: Option<&Author>) -> Vec<Person> {
    match author {
        Some(author) => {
            let mut person = Person::default();
            person.set_name(author.name.as_str());
            person.set_email(author.email.clone());
            vec![person]
        }
        None => Vec::new(),
    }
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem creating a feed. Variants include I/O and Atom
/// issues.
#[derive(Debug)]
pub enum Error {
    /// Returned when there is a generic I/O error.
    Io(std::io::Error),

    /// Returned when there is an Atom-related error.
    Atom(AtomError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Atom(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Atom(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible feed operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<AtomError> for Error {
    /// Converts [`AtomError`]s into [`Error`]. This allows us to use the `?`
    /// operator in fallible feed operations.
    fn from(err: AtomError) -> Error {
        Error::Atom(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    fn document(slug: &str, modified: &str, description: Option<&str>) -> Document {
        Document {
            path: PathBuf::from(format!("articles/{}.html", slug)),
            url: Url::parse(&format!("https://example.org/articles/{}.html", slug)).expect("url"),
            title: slug.to_uppercase(),
            description: description.map(String::from),
            modified: DateTime::parse_from_rfc3339(modified).expect("date"),
            is_article: true,
        }
    }

    fn config(size: usize) -> FeedConfig {
        FeedConfig {
            title: String::from("Example articles"),
            subtitle: Some(String::from("Latest guides")),
            author: Some(Author {
                name: String::from("Example"),
                email: None,
            }),
            home_page: Url::parse("https://example.org/").expect("url"),
            size,
        }
    }

    #[test]
    fn test_feed_is_capped_and_dated_by_newest() {
        let documents = vec![
            document("c", "2025-03-01T00:00:00Z", Some("newest")),
            document("b", "2025-02-01T00:00:00Z", None),
            document("a", "2025-01-01T00:00:00Z", None),
        ];
        let feed = feed(&config(2), &documents);
        assert_eq!(2, feed.entries().len());
        assert_eq!("https://example.org/articles/c.html", feed.entries()[0].id());
        assert_eq!(documents[0].modified, *feed.updated());
        assert_eq!(
            Some("newest"),
            feed.entries()[0].summary().map(|s| s.value.as_str())
        );
    }

    #[test]
    fn test_write_feed() -> Result<()> {
        let documents = vec![document("best-vpn", "2025-08-11T10:00:00Z", Some("Fast & safe"))];
        let mut out = Vec::new();
        write_feed(&config(50), &documents, &mut out)?;
        let xml = String::from_utf8(out).expect("utf-8");
        assert!(xml.contains("Example articles"));
        assert!(xml.contains("https://example.org/articles/best-vpn.html"));
        assert!(xml.contains("Fast &amp; safe"));
        Ok(())
    }
}
