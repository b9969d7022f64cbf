//! Writes a sitemap listing every published page with its last-modified time.

use crate::scan::Document;
use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::fmt;
use std::io::Write;

const NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Formats `dt` the way sitemaps expect: RFC 3339 in UTC with a `Z` suffix
/// and whole seconds.
pub fn lastmod(dt: &DateTime<FixedOffset>) -> String {
    dt.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Writes a sitemap for `documents`, in the order given, to `w`.
pub fn write_sitemap<W: Write>(documents: &[Document], w: W) -> Result<()> {
    let mut writer = Writer::new_with_indent(w, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut urlset = BytesStart::new("urlset");
    urlset.push_attribute(("xmlns", NAMESPACE));
    writer.write_event(Event::Start(urlset))?;
    for document in documents {
        writer.write_event(Event::Start(BytesStart::new("url")))?;
        text_element(&mut writer, "loc", document.url.as_str())?;
        text_element(&mut writer, "lastmod", &lastmod(&document.modified))?;
        writer.write_event(Event::End(BytesEnd::new("url")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("urlset")))?;
    writer.get_mut().write_all(b"\n")?;
    Ok(())
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// The result of writing a sitemap.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem writing a sitemap.
#[derive(Debug)]
pub enum Error {
    /// Returned when the output can't be written.
    Io(std::io::Error),

    /// Returned when the XML writer fails.
    Xml(quick_xml::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Xml(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Xml(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator in fallible sitemap operations.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<quick_xml::Error> for Error {
    /// Converts [`quick_xml::Error`]s into [`Error`].
    fn from(err: quick_xml::Error) -> Error {
        Error::Xml(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;
    use url::Url;

    fn document(url: &str, modified: &str) -> Document {
        Document {
            path: PathBuf::from("unused"),
            url: Url::parse(url).expect("url"),
            title: String::from("t"),
            description: None,
            modified: DateTime::parse_from_rfc3339(modified).expect("date"),
            is_article: true,
        }
    }

    #[test]
    fn test_lastmod_is_utc() {
        let dt = DateTime::parse_from_rfc3339("2025-08-11T13:00:00.250+03:00").expect("date");
        assert_eq!("2025-08-11T10:00:00Z", lastmod(&dt));
    }

    #[test]
    fn test_write_sitemap() -> Result<()> {
        let documents = vec![
            document("https://example.org/articles/a.html?x=1&y=2", "2025-08-11T13:00:00+03:00"),
            document("https://example.org/", "2025-01-01T00:00:00Z"),
        ];
        let mut out = Vec::new();
        write_sitemap(&documents, &mut out)?;
        let xml = String::from_utf8(out).expect("utf-8");

        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#));
        assert!(xml.contains("<loc>https://example.org/articles/a.html?x=1&amp;y=2</loc>"));
        assert!(xml.contains("<lastmod>2025-08-11T10:00:00Z</lastmod>"));
        assert!(xml.contains("<loc>https://example.org/</loc>"));
        let first = xml.find("a.html").expect("first");
        let second = xml.find("<loc>https://example.org/</loc>").expect("second");
        assert!(first < second);
        assert!(xml.trim_end().ends_with("</urlset>"));
        Ok(())
    }
}
