//! Marks affiliate links. Every anchor whose `href` starts with one of the
//! configured prefixes gets `rel="nofollow noopener sponsored"`; any `rel`
//! values already present are kept.

use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// The `rel` values every affiliate link must carry.
pub const REQUIRED: [&str; 3] = ["nofollow", "noopener", "sponsored"];

/// Rewrites anchors in HTML.
pub struct Patcher<'a> {
    prefixes: &'a [String],
    anchor: Regex,
    href: Regex,
    rel: Regex,
}

impl<'a> Patcher<'a> {
    /// Builds a patcher for links starting with any of `prefixes`.
    pub fn new(prefixes: &'a [String]) -> Result<Patcher<'a>> {
        Ok(Patcher {
            prefixes,
            anchor: Regex::new(r"(?is)<a\b[^>]*>")?,
            href: Regex::new(r#"(?i)\s(href)\s*=\s*"([^"]*)""#)?,
            rel: Regex::new(r#"(?i)\srel\s*=\s*"([^"]*)""#)?,
        })
    }

    /// Returns `html` with its affiliate anchors patched, or `None` if nothing
    /// needed to change.
    pub fn patch(&self, html: &str) -> Option<String> {
        if self.prefixes.is_empty() {
            return None;
        }
        let patched = self
            .anchor
            .replace_all(html, |caps: &regex::Captures| {
                let tag = &caps[0];
                self.patch_anchor(tag).unwrap_or_else(|| tag.to_owned())
            })
            .into_owned();
        if patched == html {
            None
        } else {
            Some(patched)
        }
    }

    fn patch_anchor(&self, tag: &str) -> Option<String> {
        let href = self.href.captures(tag)?;
        let target = href.get(2)?.as_str();
        if !self.prefixes.iter().any(|p| target.starts_with(p.as_str())) {
            return None;
        }

        match self.rel.captures(tag) {
            Some(rel) => {
                let whole = rel.get(0)?;
                let mut values: BTreeSet<&str> = rel.get(1)?.as_str().split_whitespace().collect();
                values.extend(REQUIRED.iter());
                let joined = values.into_iter().collect::<Vec<_>>().join(" ");
                Some(format!(
                    "{} rel=\"{}\"{}",
                    &tag[..whole.start()],
                    joined,
                    &tag[whole.end()..]
                ))
            }
            None => {
                let at = href.get(1)?.start();
                Some(format!(
                    "{}rel=\"{}\" {}",
                    &tag[..at],
                    REQUIRED.join(" "),
                    &tag[at..]
                ))
            }
        }
    }

    /// Patches each file in `paths` in place. Only files that change are
    /// written; those are returned.
    pub fn patch_files(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut changed = Vec::new();
        for path in paths {
            let html = std::fs::read_to_string(path).map_err(|err| Error::Io {
                path: path.clone(),
                err,
            })?;
            if let Some(patched) = self.patch(&html) {
                std::fs::write(path, patched).map_err(|err| Error::Io {
                    path: path.clone(),
                    err,
                })?;
                debug!(path = %path.display(), "patched affiliate links");
                changed.push(path.clone());
            }
        }
        Ok(changed)
    }
}

/// The result of patching links.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem patching links.
#[derive(Debug)]
pub enum Error {
    Io { path: PathBuf, err: std::io::Error },
    Pattern(regex::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { path, err } => write!(f, "'{}': {}", path.display(), err),
            Error::Pattern(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
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

    fn prefixes() -> Vec<String> {
        vec![String::from("https://t.me/ExampleBot")]
    }

    #[test]
    fn test_patch_adds_rel() -> Result<()> {
        let prefixes = prefixes();
        let patcher = Patcher::new(&prefixes)?;
        let html = r#"<p><a class="btn" href="https://t.me/ExampleBot?start=42">Go</a></p>"#;
        let patched = r#"<p><a class="btn" rel="nofollow noopener sponsored" "#.to_owned()
            + r#"href="https://t.me/ExampleBot?start=42">Go</a></p>"#;
        assert_eq!(Some(patched), patcher.patch(html));
        Ok(())
    }

    #[test]
    fn test_patch_merges_existing_rel() -> Result<()> {
        let prefixes = prefixes();
        let patcher = Patcher::new(&prefixes)?;
        let html = r#"<a href="https://t.me/ExampleBot" rel="nofollow external">x</a>"#;
        let patched = r#"<a href="https://t.me/ExampleBot" "#.to_owned()
            + r#"rel="external nofollow noopener sponsored">x</a>"#;
        assert_eq!(Some(patched), patcher.patch(html));
        Ok(())
    }

    #[test]
    fn test_patch_leaves_other_links() -> Result<()> {
        let prefixes = prefixes();
        let patcher = Patcher::new(&prefixes)?;
        assert_eq!(None, patcher.patch(r#"<a href="https://example.org/">home</a>"#));
        assert_eq!(
            None,
            patcher.patch(r#"<a data-href="https://t.me/ExampleBot" href="/x">x</a>"#)
        );
        let done = r#"<a href="https://t.me/ExampleBot" rel="nofollow noopener sponsored">x</a>"#;
        assert_eq!(None, patcher.patch(done));
        Ok(())
    }

    #[test]
    fn test_patch_files_only_writes_changes() -> TestResult {
        let dir = TempDir::new()?;
        let linked = dir.path().join("index.html");
        let plain = dir.path().join("plain.html");
        std::fs::write(&linked, r#"<a href="https://t.me/ExampleBot">x</a>"#)?;
        std::fs::write(&plain, "<p>nothing</p>")?;

        let prefixes = prefixes();
        let changed = Patcher::new(&prefixes)?.patch_files(&[linked.clone(), plain.clone()])?;

        assert_eq!(vec![linked.clone()], changed);
        assert!(std::fs::read_to_string(&linked)?.contains("sponsored"));
        assert_eq!("<p>nothing</p>", std::fs::read_to_string(&plain)?);
        Ok(())
    }
}
