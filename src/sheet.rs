//! The keyword sheet: a CSV file with one row per candidate article. The
//! sheet doubles as the durable [`Ledger`], recording the publication mark in
//! each row's done column.
//!
//! Columns are addressed by position (see [`crate::record`]). A first row
//! whose first cell reads `enabled` is treated as a header and preserved.

use crate::ledger::{self, Ledger};
use crate::record::{self, Conventions, Record};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// The in-memory contents of a keyword sheet, along with the path it is saved
/// back to.
#[derive(Debug)]
pub struct Sheet {
    path: PathBuf,
    rows: Vec<Vec<String>>,
    has_header: bool,
    conventions: Conventions,

    /// Maps each slug to the first row that claims it. Later rows with the
    /// same slug are duplicates and never receive a mark.
    index: HashMap<String, usize>,
}

impl Sheet {
    /// Loads the sheet at `path`.
    pub fn open(path: &Path, conventions: Conventions) -> Result<Sheet> {
        let file = File::open(path).map_err(|err| Error::Io {
            path: path.to_owned(),
            err,
        })?;
        Sheet::from_reader(path, file, conventions)
    }

    /// Loads a sheet from `reader`. `path` is where [`Sheet::save`] will write
    /// it.
    pub fn from_reader<R: Read>(path: &Path, reader: R, conventions: Conventions) -> Result<Sheet> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|err| Error::Csv {
                path: path.to_owned(),
                err,
            })?;
            rows.push(record.iter().map(String::from).collect::<Vec<String>>());
        }

        let has_header = rows
            .first()
            .and_then(|row| row.first())
            .map(|cell| cell.trim().eq_ignore_ascii_case("enabled"))
            .unwrap_or(false);

        let mut sheet = Sheet {
            path: path.to_owned(),
            rows,
            has_header,
            conventions,
            index: HashMap::new(),
        };
        sheet.normalize();
        Ok(sheet)
    }

    // Pads data rows to the fixed column count, writes normalized slugs back
    // into the slug column, and builds the slug index.
    fn normalize(&mut self) {
        let first = if self.has_header { 1 } else { 0 };
        for i in first..self.rows.len() {
            let record = match Record::from_row(i, &self.rows[i], &self.conventions) {
                Some(record) => record,
                None => continue,
            };
            let row = &mut self.rows[i];
            if row.len() < record::COLUMNS {
                row.resize(record::COLUMNS, String::new());
            }
            row[record::SLUG] = record.slug.clone();
            self.index.entry(record.slug).or_insert(i);
        }
    }

    /// The path the sheet is saved to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns every non-blank data row as a [`Record`], in sheet order.
    pub fn records(&self) -> Vec<Record> {
        let first = if self.has_header { 1 } else { 0 };
        self.rows
            .iter()
            .enumerate()
            .skip(first)
            .filter_map(|(i, row)| Record::from_row(i, row, &self.conventions))
            .collect()
    }

    /// Writes the sheet as CSV to `w`.
    pub fn write_to<W: Write>(&self, w: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(w);
        for row in &self.rows {
            writer.write_record(row).map_err(|err| Error::Csv {
                path: self.path.clone(),
                err,
            })?;
        }
        writer.flush().map_err(|err| Error::Io {
            path: self.path.clone(),
            err,
        })?;
        Ok(())
    }

    /// Saves the sheet back to its path. The sheet is first written to a
    /// sibling temporary file which then replaces the original, so an
    /// interrupted save never leaves a truncated sheet behind.
    pub fn save(&self) -> Result<()> {
        let io_err = |err| Error::Io {
            path: self.path.clone(),
            err,
        };
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        {
            let file = File::create(&tmp).map_err(io_err)?;
            self.write_to(file)?;
        }
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }
}

impl Ledger for Sheet {
    fn is_published(&self, slug: &str) -> bool {
        match self.index.get(slug) {
            Some(&row) => self.rows[row]
                .get(record::DONE)
                .map(|cell| cell.trim() == self.conventions.done_mark)
                .unwrap_or(false),
            None => false,
        }
    }

    fn mark_published(&mut self, slug: &str) -> ledger::Result<()> {
        let row = *self
            .index
            .get(slug)
            .ok_or_else(|| ledger::Error::UnknownSlug(slug.to_owned()))?;
        self.rows[row][record::DONE] = self.conventions.done_mark.clone();
        self.save().map_err(|err| ledger::Error::Persist {
            path: self.path.clone(),
            err: Box::new(err),
        })
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// The result of a fallible sheet operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem reading or writing a sheet.
#[derive(Debug)]
pub enum Error {
    /// Returned when the sheet file cannot be opened, created, or replaced.
    Io { path: PathBuf, err: std::io::Error },

    /// Returned when the sheet is not valid CSV.
    Csv { path: PathBuf, err: csv::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io { path, err } => write!(f, "keyword sheet '{}': {}", path.display(), err),
            Error::Csv { path, err } => {
                write!(f, "parsing keyword sheet '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { path: _, err } => Some(err),
            Error::Csv { path: _, err } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    const SHEET: &str = "\
enabled,keyword,title,slug,done,description
yes,vpn,Best VPN,,0,
no,tv,Smart TV,,0
yes,dup,best vpn!,,0,
,,,,,
yes,old,Old One,old-one,1,Already here
";

    fn load(contents: &str) -> Sheet {
        Sheet::from_reader(
            Path::new("keywords.csv"),
            contents.as_bytes(),
            Conventions::default(),
        )
        .expect("sheet")
    }

    #[test]
    fn test_records_skip_header_and_blank_rows() {
        let records = load(SHEET).records();
        let slugs: Vec<&str> = records.iter().map(|r| r.slug.as_str()).collect();
        assert_eq!(vec!["best-vpn", "smart-tv", "best-vpn", "old-one"], slugs);
        assert_eq!(vec![1, 2, 3, 5], records.iter().map(|r| r.row).collect::<Vec<_>>());
    }

    #[test]
    fn test_without_header() {
        let sheet = load("yes,vpn,Best VPN,,0\n");
        let records = sheet.records();
        assert_eq!(1, records.len());
        assert_eq!(0, records[0].row);
    }

    #[test]
    fn test_ledger_reads_done_column() {
        let sheet = load(SHEET);
        assert!(sheet.is_published("old-one"));
        assert!(!sheet.is_published("best-vpn"));
        assert!(!sheet.is_published("missing"));
    }

    #[test]
    fn test_write_normalizes_slugs_and_pads_rows() -> Result<()> {
        let sheet = load(SHEET);
        let mut out = Vec::new();
        sheet.write_to(&mut out)?;
        let text = String::from_utf8(out).expect("utf-8");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!("enabled,keyword,title,slug,done,description", lines[0]);
        assert_eq!("yes,vpn,Best VPN,best-vpn,0,", lines[1]);
        assert_eq!("no,tv,Smart TV,smart-tv,0,", lines[2]);
        assert_eq!("yes,dup,best vpn!,best-vpn,0,", lines[3]);
        assert_eq!(",,,,,", lines[4]);
        Ok(())
    }

    #[test]
    fn test_mark_published_persists_first_claimant() -> TestResult {
        let dir = TempDir::new()?;
        let path = dir.path().join("keywords.csv");
        std::fs::write(&path, SHEET)?;

        let mut sheet = Sheet::open(&path, Conventions::default())?;
        sheet.mark_published("best-vpn")?;
        assert!(sheet.is_published("best-vpn"));

        let reloaded = Sheet::open(&path, Conventions::default())?;
        let records = reloaded.records();
        assert!(records[0].published);
        // the duplicate row is untouched
        assert!(!records[2].published);
        assert!(!dir.path().join("keywords.csv.tmp").exists());
        Ok(())
    }

    #[test]
    fn test_mark_unknown_slug() {
        let mut sheet = load(SHEET);
        match sheet.mark_published("nope") {
            Err(ledger::Error::UnknownSlug(slug)) => assert_eq!("nope", slug),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
