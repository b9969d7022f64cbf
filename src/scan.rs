//! Finds the site's published pages and reads back the metadata the index
//! artifacts need. Pages are plain HTML files; their title, description, and
//! modification time are recovered from the markup.

use crate::escape;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;
use walkdir::WalkDir;

/// A published page.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    /// Where the page lives on disk.
    pub path: PathBuf,

    /// The page's canonical URL.
    pub url: Url,

    /// The contents of `<title>`, or the file stem if there is none.
    pub title: String,

    /// The contents of the description meta tag, if any.
    pub description: Option<String>,

    /// The `article:modified_time` meta tag if present and parseable,
    /// otherwise the file's modification time.
    pub modified: DateTime<FixedOffset>,

    /// Whether the page is an article (as opposed to a top-level page like the
    /// home page).
    pub is_article: bool,
}

/// Extracts [`Document`]s from HTML files.
pub struct Scanner<'a> {
    /// The directory the site is served from.
    pub root: &'a Path,

    /// The URL `root` is served at. Must end in a slash.
    pub site_root: &'a Url,

    /// The offset assumed for modification times that carry none.
    pub offset: FixedOffset,

    title: Regex,
    description: Regex,
    modified: Regex,
}

impl<'a> Scanner<'a> {
    /// Constructs a new scanner. See fields on [`Scanner`] for argument
    /// descriptions.
    pub fn new(root: &'a Path, site_root: &'a Url, offset: FixedOffset) -> Result<Scanner<'a>> {
        Ok(Scanner {
            root,
            site_root,
            offset,
            title: Regex::new(r"(?is)<title>(.*?)</title>")?,
            description: Regex::new(r#"(?is)<meta\s+name="description"\s+content="(.*?)""#)?,
            modified: Regex::new(
                r#"(?is)<meta\s+property="article:modified_time"\s+content="(.*?)""#,
            )?,
        })
    }

    /// Collects the documents in `pages` (skipping any that don't exist) and
    /// every `.html` file below `articles_directory`, newest first. Documents
    /// with equal modification times keep their discovery order; articles are
    /// discovered in path order.
    pub fn collect(&self, pages: &[PathBuf], articles_directory: &Path) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for page in pages.iter().filter(|p| p.is_file()) {
            documents.push(self.document(page, false)?);
        }

        if articles_directory.is_dir() {
            let walker =
                WalkDir::new(articles_directory).sort_by(|a, b| a.file_name().cmp(b.file_name()));
            for result in walker {
                let entry = result?;
                if entry.file_type().is_file() && is_html(entry.path()) {
                    documents.push(self.document(entry.path(), true)?);
                }
            }
        }

        documents.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(documents)
    }

    /// Reads a single document from `path`.
    pub fn document(&self, path: &Path, is_article: bool) -> Result<Document> {
        let annotate = |err| Error::Io {
            path: path.to_owned(),
            err,
        };
        let html = std::fs::read(path).map_err(annotate)?;
        let html = String::from_utf8_lossy(&html);
        let mtime = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .map_err(annotate)?;
        let mtime = DateTime::<FixedOffset>::from(DateTime::<Utc>::from(mtime));

        let relative = path
            .strip_prefix(self.root)
            .map_err(|_| Error::OutsideRoot(path.to_owned()))?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let url = if relative == "index.html" {
            self.site_root.clone()
        } else {
            self.site_root.join(&relative)?
        };

        let (title, description, modified) = self.metadata(&html);
        Ok(Document {
            path: path.to_owned(),
            url,
            title: title.unwrap_or_else(|| {
                path.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default()
            }),
            description,
            modified: modified.unwrap_or(mtime),
            is_article,
        })
    }

    /// Extracts the title, description, and modification time from `html`.
    pub fn metadata(
        &self,
        html: &str,
    ) -> (Option<String>, Option<String>, Option<DateTime<FixedOffset>>) {
        let capture = |re: &Regex| {
            re.captures(html)
                .and_then(|c| c.get(1))
                .map(|m| escape::unescape_html(m.as_str().trim()))
        };
        let title = capture(&self.title);
        let description = capture(&self.description).filter(|d| !d.is_empty());
        let modified = capture(&self.modified).and_then(|raw| self.parse_time(&raw));
        (title, description, modified)
    }

    // Accepts RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS` interpreted in the
    // configured offset.
    fn parse_time(&self, raw: &str) -> Option<DateTime<FixedOffset>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt);
        }
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok()?;
        self.offset.from_local_datetime(&naive).single()
    }
}

/// Lists the site's published pages: the `.html` files directly inside
/// `root` plus every `.html` file below `articles_directory`, each directory
/// in path order. Nothing else under `root` (such as the theme) is included.
pub fn site_pages(root: &Path, articles_directory: &Path) -> Result<Vec<PathBuf>> {
    let mut pages = Vec::new();
    for (dir, depth) in [(root, 1), (articles_directory, usize::MAX)] {
        if !dir.is_dir() {
            continue;
        }
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(depth)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()));
        for result in walker {
            let entry = result?;
            if entry.file_type().is_file() && is_html(entry.path()) {
                pages.push(entry.into_path());
            }
        }
    }
    Ok(pages)
}

fn is_html(path: &Path) -> bool {
    path.extension().map(|e| e == "html").unwrap_or(false)
}

/// The result of a scan.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem scanning the site.
#[derive(Debug)]
pub enum Error {
    /// Returned when a page can't be read.
    Io { path: PathBuf, err: std::io::Error },

    /// Returned for directory traversal errors.
    WalkDir(walkdir::Error),

    /// Returned when a page lies outside the site root.
    OutsideRoot(PathBuf),

    /// Returned when a page URL can't be built.
    UrlParse(url::ParseError),

    /// Returned when a metadata pattern fails to compile.
    Pattern(regex::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { path, err } => write!(f, "reading '{}': {}", path.display(), err),
            Error::WalkDir(err) => err.fmt(f),
            Error::OutsideRoot(path) => {
                write!(f, "'{}' is outside the site root", path.display())
            }
            Error::UrlParse(err) => err.fmt(f),
            Error::Pattern(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { path: _, err } => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::OutsideRoot(_) => None,
            Error::UrlParse(err) => Some(err),
            Error::Pattern(err) => Some(err),
        }
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Error {
        Error::Pattern(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    fn offset() -> FixedOffset {
        FixedOffset::east_opt(3 * 3600).expect("offset")
    }

    #[test]
    fn test_metadata() -> TestResult {
        let root = Path::new("/site");
        let site = Url::parse("https://example.org/")?;
        let scanner = Scanner::new(root, &site, offset())?;
        let (title, description, modified) = scanner.metadata(
            r#"<html><head>
<TITLE> Best VPN &amp; more </TITLE>
<meta name="description" content="Fast &quot;and&quot; safe">
<meta property="article:modified_time" content="2025-08-11T10:00:00Z">"#,
        );
        assert_eq!(Some(String::from("Best VPN & more")), title);
        assert_eq!(Some(String::from("Fast \"and\" safe")), description);
        assert_eq!(
            Some(DateTime::parse_from_rfc3339("2025-08-11T13:00:00+03:00")?),
            modified
        );
        Ok(())
    }

    #[test]
    fn test_metadata_naive_time_uses_offset() -> TestResult {
        let root = Path::new("/site");
        let site = Url::parse("https://example.org/")?;
        let scanner = Scanner::new(root, &site, offset())?;
        let (title, description, modified) = scanner.metadata(
            r#"<meta property="article:modified_time" content="2025-08-11T13:00:00">"#,
        );
        assert_eq!(None, title);
        assert_eq!(None, description);
        assert_eq!(
            Some(DateTime::parse_from_rfc3339("2025-08-11T10:00:00Z")?),
            modified
        );
        Ok(())
    }

    #[test]
    fn test_site_pages_skips_theme() -> TestResult {
        let dir = TempDir::new()?;
        let root = dir.path();
        let articles = root.join("articles");
        std::fs::create_dir_all(articles.join("nested"))?;
        std::fs::create_dir_all(root.join("theme"))?;
        for page in &[
            "index.html",
            "notes.txt",
            "theme/article.html",
            "articles/a.html",
            "articles/nested/b.html",
        ] {
            std::fs::write(root.join(page), "<p></p>")?;
        }

        assert_eq!(
            vec![
                root.join("index.html"),
                articles.join("a.html"),
                articles.join("nested/b.html"),
            ],
            site_pages(root, &articles)?
        );
        Ok(())
    }

    fn modified(at: &str) -> String {
        format!(r#"<meta property="article:modified_time" content="{}">"#, at)
    }

    #[test]
    fn test_collect_orders_newest_first() -> TestResult {
        let dir = TempDir::new()?;
        let articles = dir.path().join("articles");
        std::fs::create_dir_all(articles.join("nested"))?;
        std::fs::write(
            dir.path().join("index.html"),
            format!("<title>Home</title>{}", modified("2025-01-01T00:00:00Z")),
        )?;
        std::fs::write(
            articles.join("old.html"),
            format!("<title>Old</title>{}", modified("2024-05-01T00:00:00Z")),
        )?;
        std::fs::write(
            articles.join("nested/new.html"),
            r#"<meta property="article:modified_time" content="2025-06-01T00:00:00Z">"#,
        )?;
        std::fs::write(articles.join("notes.txt"), "ignored")?;

        let site = Url::parse("https://example.org/")?;
        let scanner = Scanner::new(dir.path(), &site, offset())?;
        let documents = scanner.collect(
            &[dir.path().join("index.html"), dir.path().join("all-articles.html")],
            &articles,
        )?;

        let urls: Vec<&str> = documents.iter().map(|d| d.url.as_str()).collect();
        assert_eq!(
            vec![
                "https://example.org/articles/nested/new.html",
                "https://example.org/",
                "https://example.org/articles/old.html",
            ],
            urls
        );
        assert_eq!("new", documents[0].title);
        assert!(documents[0].is_article);
        assert!(!documents[1].is_article);
        Ok(())
    }
}
