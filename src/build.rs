//! Exports the [`build_indexes`] function which stitches together the steps
//! of rebuilding the site's derived pages: scanning published pages
//! ([`crate::scan`]), rendering the listing ([`crate::listing`]), and writing
//! the sitemap ([`crate::sitemap`]) and Atom feed ([`crate::feed`]).

use crate::config::Config;
use crate::feed::{write_feed, Error as FeedError, FeedConfig};
use crate::listing;
use crate::publish::now;
use crate::scan::{Document, Error as ScanError, Scanner};
use crate::sitemap::{write_sitemap, Error as SitemapError};
use crate::theme::{Error as TemplateError, Theme};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Rebuilds the listing page, sitemap, and feed from the pages currently on
/// disk. The listing is dated by its newest article, so rebuilding an
/// unchanged site reproduces every file byte for byte. It is written first so
/// that the sitemap sees that date. Returns the documents the sitemap was built
/// from.
pub fn build_indexes(config: &Config, theme: &Theme) -> Result<Vec<Document>> {
    let scanner = Scanner::new(&config.root_directory, &config.site_root, config.offset)?;
    let pages = vec![
        config.root_directory.join("index.html"),
        config.listing_path.clone(),
    ];

    // render the listing
    let documents = scanner.collect(&pages, &config.articles_directory)?;
    let updated = documents
        .iter()
        .find(|d| d.is_article)
        .map(|d| d.modified)
        .unwrap_or_else(|| now(config.offset));
    let html = listing::render(&theme.listing, &documents, &config.site_root, &updated)?;
    std::fs::write(&config.listing_path, html).map_err(|err| Error::Io {
        path: config.listing_path.clone(),
        err,
    })?;
    info!(path = %config.listing_path.display(), "wrote listing");

    // rescan so the listing appears with its date
    let documents = scanner.collect(&pages, &config.articles_directory)?;

    let mut sitemap = create(&config.sitemap_path)?;
    write_sitemap(&documents, &mut sitemap)?;
    flush(sitemap, &config.sitemap_path)?;
    info!(path = %config.sitemap_path.display(), urls = documents.len(), "wrote sitemap");

    let articles: Vec<Document> = documents.iter().filter(|d| d.is_article).cloned().collect();
    let mut feed = create(&config.feed_path)?;
    write_feed(
        &FeedConfig {
            title: config.feed.title.clone(),
            subtitle: config.feed.subtitle.clone(),
            author: config.feed.author.clone(),
            home_page: config.site_root.clone(),
            size: config.feed.size,
        },
        &articles,
        &mut feed,
    )?;
    flush(feed, &config.feed_path)?;
    info!(path = %config.feed_path.display(), "wrote feed");

    Ok(documents)
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|err| Error::Io {
            path: path.to_owned(),
            err,
        })
}

fn flush(mut w: BufWriter<File>, path: &Path) -> Result<()> {
    w.flush().map_err(|err| Error::Io {
        path: path.to_owned(),
        err,
    })
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building the indexes. Errors can be during scanning,
/// templating, writing the sitemap or feed, and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors reading published pages.
    Scan(ScanError),

    /// Returned for errors rendering the listing.
    Template(TemplateError),

    /// Returned for errors writing the sitemap.
    Sitemap(SitemapError),

    /// Returned for errors writing the feed.
    Feed(FeedError),

    /// Returned for other I/O errors.
    Io { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Scan(err) => err.fmt(f),
            Error::Template(err) => write!(f, "rendering listing: {}", err),
            Error::Sitemap(err) => write!(f, "writing sitemap: {}", err),
            Error::Feed(err) => write!(f, "writing feed: {}", err),
            Error::Io { path, err } => write!(f, "writing '{}': {}", path.display(), err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Scan(err) => Some(err),
            Error::Template(err) => Some(err),
            Error::Sitemap(err) => Some(err),
            Error::Feed(err) => Some(err),
            Error::Io { path: _, err } => Some(err),
        }
    }
}

impl From<ScanError> for Error {
    /// Converts [`ScanError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ScanError) -> Error {
        Error::Scan(err)
    }
}

impl From<TemplateError> for Error {
    /// Converts [`TemplateError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: TemplateError) -> Error {
        Error::Template(err)
    }
}

impl From<SitemapError> for Error {
    /// Converts [`SitemapError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: SitemapError) -> Error {
        Error::Sitemap(err)
    }
}

impl From<FeedError> for Error {
    /// Converts [`FeedError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: FeedError) -> Error {
        Error::Feed(err)
    }
}
