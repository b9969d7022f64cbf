//! Defines the [`Ledger`] trait, the durable record of which slugs have been
//! published, along with [`MemoryLedger`], an in-memory implementation. The
//! CSV-backed implementation lives in [`crate::sheet`].

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// A store mapping slugs to their publication mark. Implementations must make
/// [`Ledger::mark_published`] durable before returning: the publisher treats a
/// successful return as a checkpoint.
pub trait Ledger {
    /// Reports whether `slug` has been marked published.
    fn is_published(&self, slug: &str) -> bool;

    /// Marks `slug` as published and persists the mark.
    fn mark_published(&mut self, slug: &str) -> Result<()>;

    /// The file backing the ledger, if any. Used to commit ledger changes.
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// A [`Ledger`] that lives only in memory.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    published: HashSet<String>,
}

impl MemoryLedger {
    /// Creates a ledger with every slug in `slugs` already marked.
    pub fn with_published<I, S>(slugs: I) -> MemoryLedger
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MemoryLedger {
            published: slugs.into_iter().map(Into::into).collect(),
        }
    }
}

impl Ledger for MemoryLedger {
    fn is_published(&self, slug: &str) -> bool {
        self.published.contains(slug)
    }

    fn mark_published(&mut self, slug: &str) -> Result<()> {
        self.published.insert(slug.to_owned());
        Ok(())
    }
}

/// The result of a fallible ledger operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to record a publication mark.
#[derive(Debug)]
pub enum Error {
    /// Returned when the slug has no entry in the ledger.
    UnknownSlug(String),

    /// Returned when the backing file could not be written.
    Persist { path: PathBuf, err: Box<dyn std::error::Error + Send + Sync> },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::UnknownSlug(slug) => write!(f, "no ledger entry for slug `{}`", slug),
            Error::Persist { path, err } => {
                write!(f, "persisting ledger '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::UnknownSlug(_) => None,
            Error::Persist { path: _, err } => Some(err.as_ref()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_memory_ledger_marks() -> Result<()> {
        let mut ledger = MemoryLedger::with_published(vec!["old"]);
        assert!(ledger.is_published("old"));
        assert!(!ledger.is_published("new"));
        ledger.mark_published("new")?;
        assert!(ledger.is_published("new"));
        assert!(ledger.location().is_none());
        Ok(())
    }
}
