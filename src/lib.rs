//! The library code for the `rowpress` article publisher. A site is a
//! directory of static HTML pages plus a keyword sheet (a CSV file) whose rows
//! describe articles to publish. The work breaks down into two independent
//! jobs:
//!
//! 1. Publishing rows ([`crate::publish`]): each enabled, unpublished row of
//!    the sheet ([`crate::sheet`]) is rendered into an article page
//!    ([`crate::article`]), written to disk, marked done in the sheet, and
//!    committed ([`crate::vcs`]). The mark is what makes re-running safe: a
//!    marked row is never published twice, and an article left behind by an
//!    interrupted run is adopted instead of rewritten.
//! 2. Maintaining the site ([`crate::build`]): the published pages are scanned
//!    ([`crate::scan`]) and the sitemap, Atom feed, and "all articles" listing
//!    are regenerated from what is actually on disk.
//!
//! Two smaller upkeep passes round this out: refreshing the date markers
//! embedded in pages ([`crate::dates`]) and tagging affiliate links
//! ([`crate::affiliate`]).

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod affiliate;
pub mod article;
pub mod build;
pub mod config;
pub mod dates;
pub mod escape;
pub mod feed;
pub mod ledger;
pub mod listing;
pub mod publish;
pub mod record;
pub mod scan;
pub mod sheet;
pub mod sitemap;
pub mod slug;
pub mod theme;
pub mod vcs;
