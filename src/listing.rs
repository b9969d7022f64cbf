//! Renders the "all articles" listing page.

use crate::escape;
use crate::scan::Document;
use crate::theme;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use gtmpl::{Template, Value};
use std::collections::HashMap;
use url::Url;

/// Converts a [`Document`] into a template [`Value`] with fields `title`,
/// `url`, `description` (nil if absent), `date` (`dd.mm.yyyy`), and
/// `modified` (RFC 3339).
fn summarize(document: &Document) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("title".to_owned(), Value::String(escape::html(&document.title)));
    m.insert("url".to_owned(), Value::String(escape::href(document.url.as_str())));
    m.insert(
        "description".to_owned(),
        match &document.description {
            Some(d) => Value::String(escape::html(d)),
            None => Value::Nil,
        },
    );
    m.insert(
        "date".to_owned(),
        Value::String(document.modified.format("%d.%m.%Y").to_string()),
    );
    m.insert("modified".to_owned(), Value::String(document.modified.to_rfc3339()));
    Value::Object(m)
}

/// Renders the listing of every article in `documents` (other pages are
/// left out), in the order given. The template receives `items` (see
/// the fields above), `count`, `home_page`, and the listing's own date
/// `updated` as both `updated` (`dd.mm.yyyy`) and `modified` (RFC 3339).
pub fn render(
    template: &Template,
    documents: &[Document],
    home_page: &Url,
    updated: &DateTime<FixedOffset>,
) -> theme::Result<String> {
    let items: Vec<Value> = documents
        .iter()
        .filter(|d| d.is_article)
        .map(summarize)
        .collect();

    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("count".to_owned(), Value::from(items.len() as u64));
    m.insert("items".to_owned(), Value::Array(items));
    m.insert("home_page".to_owned(), Value::String(escape::href(home_page.as_str())));
    m.insert(
        "updated".to_owned(),
        Value::String(updated.format("%d.%m.%Y").to_string()),
    );
    m.insert(
        "modified".to_owned(),
        Value::String(updated.to_rfc3339_opts(SecondsFormat::Secs, false)),
    );
    theme::execute(template, Value::Object(m))
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    const TEMPLATE: &str = concat!(
        r#"<h1>{{ .count }} articles</h1><ul>
{{ range .items }}<li><a href="{{ .url }}">{{ .title }}</a>"#,
        r#"{{ if .description }} {{ .description }}{{ end }}</li>
{{ end }}</ul>"#
    );

    fn document(slug: &str, title: &str, is_article: bool) -> Document {
        Document {
            path: PathBuf::from(format!("{}.html", slug)),
            url: Url::parse(&format!("https://example.org/articles/{}.html", slug)).expect("url"),
            title: title.to_owned(),
            description: if slug == "b" { Some(String::from("B & co")) } else { None },
            modified: DateTime::parse_from_rfc3339("2025-08-11T10:00:00Z").expect("date"),
            is_article,
        }
    }

    #[test]
    fn test_render_lists_articles_only() -> Result<(), Box<dyn std::error::Error>> {
        let template = theme::parse_str(TEMPLATE)?;
        let documents = vec![
            document("a", "Alpha <1>", true),
            document("index", "Home", false),
            document("b", "Beta", true),
        ];
        let now = DateTime::parse_from_rfc3339("2025-08-11T10:00:00Z")?;
        let out = render(&template, &documents, &Url::parse("https://example.org/")?, &now)?;

        assert!(out.contains("<h1>2 articles</h1>"));
        let alpha = r#"<a href="https://example.org/articles/a.html">Alpha &lt;1&gt;</a></li>"#;
        assert!(out.contains(alpha));
        assert!(out.contains("Beta</a> B &amp; co</li>"));
        assert!(!out.contains("Home"));
        assert!(out.find("a.html") < out.find("b.html"));
        Ok(())
    }
}
