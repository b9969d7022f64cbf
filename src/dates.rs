//! Refreshes the date markers embedded in pages so that "current as of"
//! notices stay current. Two markers are recognized:
//!
//! ```html
//! <!--DAILY_DMY-->11.08.2025<!--/DAILY_DMY-->
//! <!--DAILY_ISO-->2025-08-11T13:00:00+03:00<!--/DAILY_ISO-->
//! ```
//!
//! Only published pages are refreshed, never theme templates. A page
//! containing `<!--DAILY_FREEZE-->` is never touched.

use chrono::{DateTime, FixedOffset, SecondsFormat};
use regex::{NoExpand, Regex};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Marks a page whose dates must not change.
pub const FREEZE: &str = "<!--DAILY_FREEZE-->";

/// Finds and replaces date markers.
pub struct Markers {
    dmy: Regex,
    iso: Regex,
}

impl Markers {
    /// Compiles the marker patterns.
    pub fn new() -> Result<Markers> {
        Ok(Markers {
            dmy: Regex::new(r"(?is)<!--DAILY_DMY-->.*?<!--/DAILY_DMY-->")?,
            iso: Regex::new(r"(?is)<!--DAILY_ISO-->.*?<!--/DAILY_ISO-->")?,
        })
    }

    /// Returns `text` with every marker set to `now`, or `None` if the page is
    /// frozen or nothing changed.
    pub fn refresh(&self, text: &str, now: &DateTime<FixedOffset>) -> Option<String> {
        if text.contains(FREEZE) {
            return None;
        }
        let dmy = format!(
            "<!--DAILY_DMY-->{}<!--/DAILY_DMY-->",
            now.format("%d.%m.%Y")
        );
        let iso = format!(
            "<!--DAILY_ISO-->{}<!--/DAILY_ISO-->",
            now.to_rfc3339_opts(SecondsFormat::Secs, false)
        );
        let replaced = self.dmy.replace_all(text, NoExpand(&dmy));
        let replaced = self.iso.replace_all(&replaced, NoExpand(&iso)).into_owned();
        if replaced == text {
            None
        } else {
            Some(replaced)
        }
    }

    /// Refreshes each page in `paths` (see [`crate::scan::site_pages`]).
    /// Returns the pages that were rewritten.
    pub fn refresh_files(
        &self,
        paths: &[PathBuf],
        now: &DateTime<FixedOffset>,
    ) -> Result<Vec<PathBuf>> {
        let mut changed = Vec::new();
        for path in paths {
            let text = read(path)?;
            if !text.contains("DAILY_DMY") && !text.contains("DAILY_ISO") {
                continue;
            }
            if let Some(updated) = self.refresh(&text, now) {
                std::fs::write(path, updated).map_err(|err| Error::Io {
                    path: path.clone(),
                    err,
                })?;
                debug!(path = %path.display(), "refreshed dates");
                changed.push(path.clone());
            }
        }
        Ok(changed)
    }
}

fn read(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|err| Error::Io {
        path: path.to_owned(),
        err,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// The result of a refresh.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem refreshing dates.
#[derive(Debug)]
pub enum Error {
    /// Returned when a page can't be read or written.
    Io { path: PathBuf, err: std::io::Error },

    /// Returned when a marker pattern fails to compile.
    Pattern(regex::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { path, err } => write!(f, "'{}': {}", path.display(), err),
            Error::Pattern(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { path: _, err } => Some(err),
            Error::Pattern(err) => Some(err),
        }
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

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2025-08-11T13:00:00+03:00").expect("date")
    }

    #[test]
    fn test_refresh_replaces_both_markers() -> Result<()> {
        let markers = Markers::new()?;
        let text = "<p><!--DAILY_DMY-->01.01.2020<!--/DAILY_DMY--></p>\
                    <time><!--daily_iso-->2020-01-01T00:00:00<!--/daily_iso--></time>\
                    <p><!--DAILY_DMY--><!--/DAILY_DMY--></p>";
        assert_eq!(
            Some(String::from(
                "<p><!--DAILY_DMY-->11.08.2025<!--/DAILY_DMY--></p>\
                 <time><!--DAILY_ISO-->2025-08-11T13:00:00+03:00<!--/DAILY_ISO--></time>\
                 <p><!--DAILY_DMY-->11.08.2025<!--/DAILY_DMY--></p>"
            )),
            markers.refresh(text, &now())
        );
        Ok(())
    }

    #[test]
    fn test_refresh_unchanged_and_frozen() -> Result<()> {
        let markers = Markers::new()?;
        let current = "<!--DAILY_DMY-->11.08.2025<!--/DAILY_DMY-->";
        assert_eq!(None, markers.refresh(current, &now()));
        let frozen = "<!--DAILY_FREEZE--><!--DAILY_DMY-->01.01.2020<!--/DAILY_DMY-->";
        assert_eq!(None, markers.refresh(frozen, &now()));
        Ok(())
    }

    #[test]
    fn test_refresh_site_leaves_theme_alone() -> TestResult {
        let dir = TempDir::new()?;
        let root = dir.path();
        let articles = root.join("articles");
        std::fs::create_dir_all(&articles)?;
        std::fs::create_dir_all(root.join("theme"))?;
        let stale = "<!--DAILY_DMY-->01.01.2020<!--/DAILY_DMY-->";
        let template = "<!--DAILY_DMY-->{{ .updated }}<!--/DAILY_DMY-->";
        std::fs::write(root.join("index.html"), stale)?;
        std::fs::write(articles.join("a.html"), stale)?;
        std::fs::write(articles.join("plain.html"), "<p>no markers</p>")?;
        std::fs::write(root.join("theme/article.html"), template)?;

        let pages = crate::scan::site_pages(root, &articles)?;
        let changed = Markers::new()?.refresh_files(&pages, &now())?;

        assert_eq!(vec![root.join("index.html"), articles.join("a.html")], changed);
        assert_eq!(template, std::fs::read_to_string(root.join("theme/article.html"))?);
        assert!(std::fs::read_to_string(articles.join("a.html"))?.contains("11.08.2025"));
        Ok(())
    }
}
