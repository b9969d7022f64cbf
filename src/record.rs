//! Defines the [`Record`] type, one candidate article as read from a row of
//! the keyword sheet, and the [`Conventions`] that govern how raw cells are
//! interpreted.

use crate::slug;

/// Column holding the enable flag.
pub const ENABLED: usize = 0;
/// Column holding the key phrase.
pub const KEYWORD: usize = 1;
/// Column holding the title (used for `<title>` and the heading).
pub const TITLE: usize = 2;
/// Column holding the slug. Normalized on save.
pub const SLUG: usize = 3;
/// Column holding the publication mark.
pub const DONE: usize = 4;
/// Optional column holding the meta description.
pub const DESCRIPTION: usize = 5;
/// Optional column holding the regenerate override.
pub const REGENERATE: usize = 6;

/// The number of columns every saved row is padded to.
pub const COLUMNS: usize = 6;

/// How raw cell values are read. These come from the project file.
#[derive(Clone, Debug)]
pub struct Conventions {
    /// The (case-insensitive) value of the enable and regenerate columns that
    /// means "yes".
    pub enabled_value: String,

    /// The value of the done column that marks a record as published.
    pub done_mark: String,

    /// The title used when both the title and keyword cells are blank.
    pub default_title: String,

    /// The slug used when normalization leaves nothing behind.
    pub placeholder_slug: String,
}

impl Default for Conventions {
    fn default() -> Self {
        Conventions {
            enabled_value: String::from("yes"),
            done_mark: String::from("1"),
            default_title: String::from("Untitled"),
            placeholder_slug: String::from("page"),
        }
    }
}

impl Conventions {
    fn is_affirmative(&self, cell: &str) -> bool {
        cell.trim().eq_ignore_ascii_case(&self.enabled_value)
    }
}

/// One candidate article.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// The zero-based row index in the sheet, header included.
    pub row: usize,

    /// Whether the enable cell holds the affirmative value.
    pub enabled: bool,

    /// The key phrase.
    pub keyword: String,

    /// The title, after falling back to the keyword and then the default
    /// title.
    pub title: String,

    /// The normalized identifier. Derived from the slug cell, or from the
    /// title if the slug cell is blank.
    pub slug: String,

    /// Whether the done cell already holds the publication mark.
    pub published: bool,

    /// The meta description, if the sheet provides one.
    pub description: Option<String>,

    /// Whether an existing article for this record should be rendered again
    /// rather than adopted.
    pub regenerate: bool,
}

impl Record {
    /// Reads a record from the cells of row `row`. Returns `None` for blank
    /// rows (every cell empty or whitespace).
    pub fn from_row(row: usize, cells: &[String], conventions: &Conventions) -> Option<Record> {
        if cells.iter().all(|c| c.trim().is_empty()) {
            return None;
        }

        let cell = |i: usize| cells.get(i).map(|c| c.trim()).unwrap_or("");

        let keyword = cell(KEYWORD).to_owned();
        let title = [cell(TITLE), cell(KEYWORD)]
            .iter()
            .find(|s| !s.is_empty())
            .map(|s| s.to_string())
            .unwrap_or_else(|| conventions.default_title.clone());
        let slug_source = match cell(SLUG) {
            "" => title.as_str(),
            explicit => explicit,
        };

        Some(Record {
            row,
            enabled: conventions.is_affirmative(cell(ENABLED)),
            slug: slug::normalize(slug_source, &conventions.placeholder_slug),
            published: cell(DONE) == conventions.done_mark,
            description: match cell(DESCRIPTION) {
                "" => None,
                d => Some(d.to_owned()),
            },
            regenerate: conventions.is_affirmative(cell(REGENERATE)),
            keyword,
            title,
        })
    }
}
