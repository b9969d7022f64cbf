//! Loads the theme's templates. Each template is assembled from a list of
//! files which are concatenated in order before parsing, so a theme can share
//! `{{ define }}` blocks between the article and listing templates.

use crate::config::Config;
use gtmpl::Template;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The parsed templates.
pub struct Theme {
    /// Renders a single article page.
    pub article: Template,

    /// Renders the "all articles" listing page.
    pub listing: Template,
}

impl Theme {
    /// Loads and parses the templates named by `config`.
    pub fn load(config: &Config) -> Result<Theme> {
        Ok(Theme {
            article: parse_template(config.article_template.iter())?,
            listing: parse_template(config.listing_template.iter())?,
        })
    }
}

/// Loads the template file contents, concatenates them, and parses the result
/// into a template.
pub fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut contents = String::new();
    for template_file in template_files {
        use std::io::Read;
        let template_file = template_file.as_ref();
        File::open(template_file)
            .and_then(|mut file| file.read_to_string(&mut contents))
            .map_err(|e| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err: e,
            })?;
        contents.push(' ');
    }

    parse_str(&contents)
}

/// Parses a template from a string.
pub fn parse_str(contents: &str) -> Result<Template> {
    let mut template = Template::default();
    template.parse(contents).map_err(Error::ParseTemplate)?;
    Ok(template)
}

/// Executes `template` against `value` and returns the output.
pub fn execute(template: &Template, value: gtmpl::Value) -> Result<String> {
    let context = gtmpl::Context::from(value).map_err(Error::Execute)?;
    let mut out: Vec<u8> = Vec::new();
    template.execute(&mut out, &context).map_err(Error::Execute)?;
    String::from_utf8(out).map_err(|e| Error::Execute(e.to_string()))
}

/// The result of loading or executing a template.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading or executing a template.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while reading template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate(String),

    /// Returned for errors executing a template.
    Execute(String),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OpenTemplateFile { path, err } => {
                write!(f, "opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate(err) => write!(f, "parsing template: {}", err),
            Error::Execute(err) => write!(f, "executing template: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate(_) => None,
            Error::Execute(_) => None,
        }
    }
}
