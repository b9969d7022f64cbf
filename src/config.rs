//! Loads the project configuration. A project is a directory containing a
//! `rowpress.yaml` file; its `theme/` subdirectory holds a `theme.yaml` which
//! lists the template files.

use crate::record::Conventions;
use crate::slug;
use chrono::FixedOffset;
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file.
pub const PROJECT_FILE: &str = "rowpress.yaml";

#[derive(Deserialize)]
struct PauseSeconds(u64);
impl Default for PauseSeconds {
    fn default() -> Self {
        PauseSeconds(60)
    }
}

#[derive(Deserialize)]
struct DescriptionLength(usize);
impl Default for DescriptionLength {
    fn default() -> Self {
        DescriptionLength(155)
    }
}

#[derive(Deserialize)]
struct FeedSize(usize);
impl Default for FeedSize {
    fn default() -> Self {
        FeedSize(50)
    }
}

#[derive(Deserialize)]
struct UtcOffsetHours(i32);
impl Default for UtcOffsetHours {
    fn default() -> Self {
        UtcOffsetHours(3)
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Project {
    site_root: Url,

    #[serde(default)]
    keywords: Option<PathBuf>,

    #[serde(default)]
    articles_directory: Option<String>,

    #[serde(default)]
    listing_file: Option<String>,

    #[serde(default)]
    sitemap_file: Option<String>,

    #[serde(default)]
    feed_file: Option<String>,

    #[serde(default)]
    enabled_value: Option<String>,

    #[serde(default)]
    done_mark: Option<String>,

    #[serde(default)]
    default_title: Option<String>,

    #[serde(default)]
    placeholder_slug: Option<String>,

    #[serde(default)]
    pause_seconds: PauseSeconds,

    #[serde(default)]
    description_length: DescriptionLength,

    #[serde(default)]
    utc_offset_hours: UtcOffsetHours,

    #[serde(default)]
    affiliate_links: Vec<String>,

    feed: FeedSection,

    #[serde(default)]
    git: GitSection,
}

#[derive(Deserialize)]
struct FeedSection {
    title: String,

    #[serde(default)]
    subtitle: Option<String>,

    #[serde(default)]
    author: Option<Author>,

    #[serde(default)]
    size: FeedSize,
}

#[derive(Deserialize, Default)]
struct GitSection {
    #[serde(default)]
    enabled: Option<bool>,

    #[serde(default)]
    remote: Option<String>,

    #[serde(default)]
    branch: Option<String>,
}

#[derive(Deserialize)]
struct Theme {
    article_template: Vec<PathBuf>,
    listing_template: Vec<PathBuf>,
}

/// The feed's author.
#[derive(Deserialize, Clone, Debug)]
pub struct Author {
    pub name: String,

    #[serde(default)]
    pub email: Option<String>,
}

/// Where and how commits are pushed.
#[derive(Clone, Debug)]
pub struct GitConfig {
    /// Whether publishing commits and pushes at all.
    pub enabled: bool,
    pub remote: String,
    pub branch: String,
}

/// Feed metadata.
#[derive(Clone, Debug)]
pub struct FeedConfig {
    pub title: String,
    pub subtitle: Option<String>,
    pub author: Option<Author>,

    /// The maximum number of entries in the feed.
    pub size: usize,
}

/// The fully resolved configuration. All paths are absolute (or relative to
/// the working directory if the project directory was given that way).
#[derive(Clone, Debug)]
pub struct Config {
    /// The directory containing the project file.
    pub root_directory: PathBuf,

    /// The canonical site URL, always with a trailing slash.
    pub site_root: Url,

    /// The keyword sheet.
    pub keywords_path: PathBuf,

    /// The directory articles are written to.
    pub articles_directory: PathBuf,

    /// The URL articles are served from (`{site_root}{articles_directory}/`).
    pub articles_url: Url,

    pub listing_path: PathBuf,
    pub listing_url: Url,
    pub sitemap_path: PathBuf,
    pub feed_path: PathBuf,

    pub article_template: Vec<PathBuf>,
    pub listing_template: Vec<PathBuf>,

    pub conventions: Conventions,
    pub pause_seconds: u64,
    pub description_length: usize,

    /// The offset dates are rendered in and naive times are read in.
    pub offset: FixedOffset,

    pub affiliate_links: Vec<String>,
    pub feed: FeedConfig,
    pub git: GitConfig,
}

impl Config {
    /// Searches `dir` and then each of its ancestors for a project file and
    /// loads the first one found.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let mut current = Some(dir);
        while let Some(dir) = current {
            let path = dir.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path);
            }
            current = dir.parent();
        }
        Err(Error::ProjectFileNotFound(dir.to_owned()))
    }

    /// Loads the project file at `path` along with its theme.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path)?)
            .map_err(|err| Error::DeserializeYaml { path: path.to_owned(), err })?;
        let root = path
            .parent()
            .ok_or_else(|| Error::NoParentDirectory(path.to_owned()))?;

        let theme_dir = root.join("theme");
        let theme_path = theme_dir.join("theme.yaml");
        let theme: Theme = serde_yaml::from_reader(open(&theme_path)?)
            .map_err(|err| Error::DeserializeYaml { path: theme_path.clone(), err })?;

        Config::resolve(root, project, theme, &theme_dir)
    }

    fn resolve(root: &Path, project: Project, theme: Theme, theme_dir: &Path) -> Result<Config> {
        let site_root = with_trailing_slash(project.site_root);

        let articles_directory = project
            .articles_directory
            .unwrap_or_else(|| String::from("articles"));
        let articles_directory = articles_directory.trim_matches('/');
        let articles_url = site_root.join(&format!("{}/", articles_directory))?;

        let listing_file = project
            .listing_file
            .unwrap_or_else(|| String::from("all-articles.html"));

        let hours = project.utc_offset_hours.0;
        let offset = hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or(Error::InvalidOffset(hours))?;

        let defaults = Conventions::default();
        let conventions = Conventions {
            enabled_value: project.enabled_value.unwrap_or(defaults.enabled_value),
            done_mark: project.done_mark.unwrap_or(defaults.done_mark),
            default_title: project.default_title.unwrap_or(defaults.default_title),
            placeholder_slug: slug::normalize(
                &project
                    .placeholder_slug
                    .unwrap_or_else(|| defaults.placeholder_slug.clone()),
                &defaults.placeholder_slug,
            ),
        };

        Ok(Config {
            root_directory: root.to_owned(),
            keywords_path: root.join(
                project
                    .keywords
                    .unwrap_or_else(|| PathBuf::from("content/keywords.csv")),
            ),
            articles_directory: root.join(articles_directory),
            articles_url,
            listing_path: root.join(&listing_file),
            listing_url: site_root.join(&listing_file)?,
            sitemap_path: root.join(
                project
                    .sitemap_file
                    .unwrap_or_else(|| String::from("sitemap.xml")),
            ),
            feed_path: root.join(project.feed_file.unwrap_or_else(|| String::from("feed.atom"))),
            article_template: theme
                .article_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            listing_template: theme
                .listing_template
                .iter()
                .map(|relpath| theme_dir.join(relpath))
                .collect(),
            conventions,
            pause_seconds: project.pause_seconds.0,
            description_length: project.description_length.0,
            offset,
            affiliate_links: project.affiliate_links,
            feed: FeedConfig {
                title: project.feed.title,
                subtitle: project.feed.subtitle,
                author: project.feed.author,
                size: project.feed.size.0,
            },
            git: GitConfig {
                enabled: project.git.enabled.unwrap_or(true),
                remote: project.git.remote.unwrap_or_else(|| String::from("origin")),
                branch: project
                    .git
                    .branch
                    .or_else(|| std::env::var("GITHUB_REF_NAME").ok())
                    .unwrap_or_else(|| String::from("main")),
            },
            site_root,
        })
    }
}

// `Url::join` treats the last path segment as a file name unless the URL
// ends in a slash, so the site root must always carry one.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|err| Error::Open { path: path.to_owned(), err })
}

/// The result of loading configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading configuration. Every variant is fatal.
#[derive(Debug)]
pub enum Error {
    /// Returned when no project file exists in the directory or any ancestor.
    ProjectFileNotFound(PathBuf),

    /// Returned when the project file path has no parent directory.
    NoParentDirectory(PathBuf),

    /// Returned when the project or theme file can't be opened.
    Open { path: PathBuf, err: std::io::Error },

    /// Returned when the project or theme file isn't valid.
    DeserializeYaml { path: PathBuf, err: serde_yaml::Error },

    /// Returned when a derived URL can't be built from `site_root`.
    UrlParse(url::ParseError),

    /// Returned when `utc_offset_hours` is out of range.
    InvalidOffset(i32),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ProjectFileNotFound(dir) => write!(
                f,
                "could not find `{}` in '{}' or any parent directory",
                PROJECT_FILE,
                dir.display()
            ),
            Error::NoParentDirectory(path) => write!(
                f,
                "can't get parent directory for project file '{}'",
                path.display()
            ),
            Error::Open { path, err } => write!(f, "opening '{}': {}", path.display(), err),
            Error::DeserializeYaml { path, err } => {
                write!(f, "loading '{}': {}", path.display(), err)
            }
            Error::UrlParse(err) => err.fmt(f),
            Error::InvalidOffset(hours) => {
                write!(f, "utc_offset_hours {} is not a valid offset", hours)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ProjectFileNotFound(_) => None,
            Error::NoParentDirectory(_) => None,
            Error::Open { path: _, err } => Some(err),
            Error::DeserializeYaml { path: _, err } => Some(err),
            Error::UrlParse(err) => Some(err),
            Error::InvalidOffset(_) => None,
        }
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL joining.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}
