//! The row publisher. Walks the records of a keyword sheet in order and turns
//! each eligible one into an article page, recording the publication in a
//! [`Ledger`] before moving on.
//!
//! For every record, in order:
//!
//! 1. Skip it if its slug was already claimed by an earlier record in this
//!    run, if it isn't enabled, or if it's already marked published.
//! 2. If its article file already exists (a previous run was interrupted
//!    between writing and marking), mark it published without rendering.
//! 3. Otherwise render it, write the article, and mark it published.
//! 4. Publish the article and ledger through [`Publish`].
//!
//! The article is always written before it is marked, so a mark never exists
//! without its article. The reverse (an article without a mark) is the state
//! step 2 recovers from, which makes re-running after any failure safe.

use crate::article::{self, Renderer};
use crate::ledger::{self, Ledger};
use crate::record::Record;
use crate::vcs::{self, Publish};
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// What happened to a single record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// A new article was written and marked.
    Published,

    /// An existing article was rendered again because the record asked for
    /// it.
    Regenerated,

    /// An article already existed for an unmarked record; it was marked
    /// without being rewritten.
    Adopted,

    /// The record isn't enabled.
    Disabled,

    /// The record was already marked.
    AlreadyPublished,

    /// An earlier record in the same run claimed the slug.
    Duplicate,
}

/// One line of a [`Report`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub row: usize,
    pub slug: String,
    pub outcome: Outcome,
}

/// The outcome of every record a run visited, in order.
#[derive(Clone, Debug, Default)]
pub struct Report {
    pub entries: Vec<Entry>,
}

impl Report {
    /// The number of records with `outcome`.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.entries.iter().filter(|e| e.outcome == outcome).count()
    }

    /// The outcome recorded for `slug`'s first occurrence, if any.
    pub fn outcome(&self, slug: &str) -> Option<Outcome> {
        self.entries
            .iter()
            .find(|e| e.slug == slug)
            .map(|e| e.outcome)
    }

    /// Reports whether the run wrote any article.
    pub fn wrote_any(&self) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e.outcome, Outcome::Published | Outcome::Regenerated))
    }

    fn push(&mut self, record: &Record, outcome: Outcome) {
        self.entries.push(Entry {
            row: record.row,
            slug: record.slug.clone(),
            outcome,
        });
    }
}

/// Turns records into article files.
pub struct Publisher<'a> {
    /// Renders article pages.
    pub renderer: &'a Renderer<'a>,

    /// The directory articles are written to, as `{slug}.html`.
    pub output_directory: &'a Path,

    /// Publishes each written article and ledger change.
    pub vcs: &'a dyn Publish,

    /// How long to wait between two publications. Nothing waits before the
    /// first publication or after the last.
    pub pause: Duration,

    /// Performs the pause; [`std::thread::sleep`] outside of tests.
    pub sleep: &'a dyn Fn(Duration),

    /// The offset article dates are rendered in.
    pub offset: FixedOffset,
}

impl Publisher<'_> {
    /// Processes `records` in order against `ledger`. Returns at the first
    /// failure; records completed before it stay published.
    pub fn run<L: Ledger>(&self, records: &[Record], ledger: &mut L) -> Result<Report> {
        std::fs::create_dir_all(self.output_directory).map_err(|err| Error::Io {
            path: self.output_directory.to_owned(),
            err,
        })?;

        let mut report = Report::default();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut wrote_any = false;

        for record in records {
            let slug = record.slug.as_str();
            if !seen.insert(slug) {
                warn!(slug, row = record.row, "duplicate slug, skipping");
                report.push(record, Outcome::Duplicate);
                continue;
            }
            if !record.enabled {
                info!(slug, "disabled, skipping");
                report.push(record, Outcome::Disabled);
                continue;
            }
            if record.published || ledger.is_published(slug) {
                info!(slug, "already published, skipping");
                report.push(record, Outcome::AlreadyPublished);
                continue;
            }

            let path = self.output_directory.join(article::file_name(slug));
            let exists = path.exists();
            if exists && !record.regenerate {
                info!(slug, "article already exists, marking published");
                self.adopt(record, &path, ledger)
                    .map_err(|e| Error::Annotated(format!("adopting `{}`", slug), Box::new(e)))?;
                report.push(record, Outcome::Adopted);
                continue;
            }

            if wrote_any && !self.pause.is_zero() {
                info!(seconds = self.pause.as_secs(), "pausing");
                (self.sleep)(self.pause);
            }

            self.publish(record, &path, ledger)
                .map_err(|e| Error::Annotated(format!("publishing `{}`", slug), Box::new(e)))?;
            wrote_any = true;
            let outcome = if exists {
                Outcome::Regenerated
            } else {
                Outcome::Published
            };
            info!(slug, path = %path.display(), ?outcome, "published");
            report.push(record, outcome);
        }

        if !wrote_any {
            info!("nothing to publish");
        }
        Ok(report)
    }

    fn adopt<L: Ledger>(&self, record: &Record, path: &Path, ledger: &mut L) -> Result<()> {
        ledger.mark_published(&record.slug)?;
        self.commit(
            &format!("mark done for existing article: {}", record.slug),
            path,
            ledger,
        )
    }

    fn publish<L: Ledger>(&self, record: &Record, path: &Path, ledger: &mut L) -> Result<()> {
        let html = self.renderer.render(record, &now(self.offset))?;
        write_atomic(path, &html)?;
        ledger.mark_published(&record.slug)?;
        self.commit(&format!("add article: {}", record.slug), path, ledger)
    }

    fn commit<L: Ledger>(&self, message: &str, article: &Path, ledger: &L) -> Result<()> {
        let mut paths: Vec<&Path> = vec![article];
        if let Some(location) = ledger.location() {
            paths.push(location);
        }
        self.vcs.publish(message, &paths)?;
        Ok(())
    }
}

/// The current time in `offset`.
pub fn now(offset: FixedOffset) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&offset)
}

// Writes `contents` next to `path` and then moves it into place. A partially
// written article must never sit at `path`, since an existing file is taken as
// proof of publication.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let mut tmp = path.to_owned().into_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, contents).map_err(|err| Error::Io {
        path: tmp.clone(),
        err,
    })?;
    std::fs::rename(&tmp, path).map_err(|err| Error::Io {
        path: path.to_owned(),
        err,
    })
}

/// The result of a publishing run.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed publishing step. Any of these aborts the run.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems writing articles.
    Io { path: PathBuf, err: std::io::Error },

    /// Returned when an article can't be rendered.
    Render(article::Error),

    /// Returned when a mark can't be persisted.
    Ledger(ledger::Error),

    /// Returned when publishing fails.
    Publish(vcs::Error),

    /// An error with an annotation naming the record.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { path, err } => write!(f, "writing '{}': {}", path.display(), err),
            Error::Render(err) => write!(f, "rendering: {}", err),
            Error::Ledger(err) => err.fmt(f),
            Error::Publish(err) => err.fmt(f),
            Error::Annotated(annotation, err) => write!(f, "{}: {}", annotation, err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { path: _, err } => Some(err),
            Error::Render(err) => Some(err),
            Error::Ledger(err) => Some(err),
            Error::Publish(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<article::Error> for Error {
    fn from(err: article::Error) -> Error {
        Error::Render(err)
    }
}

impl From<ledger::Error> for Error {
    fn from(err: ledger::Error) -> Error {
        Error::Ledger(err)
    }
}

impl From<vcs::Error> for Error {
    fn from(err: vcs::Error) -> Error {
        Error::Publish(err)
    }
}
