//! Publishing through version control. Each published change is committed
//! and pushed on its own, so a run interrupted at any point leaves the remote
//! with every article that was completed before the interruption.

#[cfg(test)]
use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use tracing::{debug, info, warn};

/// Makes written files visible to the outside world.
pub trait Publish {
    /// Publishes the files at `paths` with a description of the change.
    fn publish(&self, message: &str, paths: &[&Path]) -> Result<()>;
}

/// A [`Publish`] that only logs. Used when git publishing is disabled.
#[derive(Debug, Default)]
pub struct Offline;

impl Publish for Offline {
    fn publish(&self, message: &str, paths: &[&Path]) -> Result<()> {
        info!(commit = message, files = paths.len(), "skipping publish (offline)");
        Ok(())
    }
}

/// A [`Publish`] that keeps a log of every call.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct Recorder {
    calls: RefCell<Vec<(String, Vec<PathBuf>)>>,
}

#[cfg(test)]
impl Recorder {
    /// Returns the recorded messages in call order.
    pub fn messages(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(m, _)| m.clone()).collect()
    }

    /// Returns the recorded calls in call order.
    pub fn calls(&self) -> Vec<(String, Vec<PathBuf>)> {
        self.calls.borrow().clone()
    }
}

#[cfg(test)]
impl Publish for Recorder {
    fn publish(&self, message: &str, paths: &[&Path]) -> Result<()> {
        self.calls.borrow_mut().push((
            message.to_owned(),
            paths.iter().map(|p| p.to_path_buf()).collect(),
        ));
        Ok(())
    }
}

/// The identity committed under when the repository has none configured.
const BOT_NAME: &str = "github-actions[bot]";
const BOT_EMAIL: &str = "41898282+github-actions[bot]@users.noreply.github.com";

/// A [`Publish`] that commits and pushes with the `git` command line.
#[derive(Debug)]
pub struct Git {
    /// The working tree.
    pub root: PathBuf,
    pub remote: String,
    pub branch: String,
}

impl Git {
    /// Makes sure commits have an author, configuring a bot identity for the
    /// repository if none is set. Fails if `git` itself can't be run.
    pub fn ensure_identity(&self) -> Result<()> {
        if self.run(&["config", "user.name"]).is_ok() {
            return Ok(());
        }
        info!(name = BOT_NAME, "no git identity configured, using bot identity");
        self.run(&["config", "user.name", BOT_NAME])?;
        self.run(&["config", "user.email", BOT_EMAIL])?;
        Ok(())
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        debug!(command = %format!("git {}", args.join(" ")), "running");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(Error::Spawn)?;
        if !output.status.success() {
            return Err(Error::Command {
                command: args.join(" "),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Publish for Git {
    fn publish(&self, message: &str, paths: &[&Path]) -> Result<()> {
        let mut add: Vec<String> = vec![String::from("add"), String::from("--")];
        add.extend(paths.iter().map(|p| p.to_string_lossy().into_owned()));
        self.run(&add.iter().map(String::as_str).collect::<Vec<&str>>())?;

        // `diff --quiet` exits non-zero only when something is staged.
        if self.run(&["diff", "--cached", "--quiet"]).is_ok() {
            info!(commit = message, "nothing to commit");
            return Ok(());
        }

        self.run(&["commit", "-m", message])?;

        // Replays the new commit on top of whatever reached the remote since
        // the last pull. A conflicting rebase is rolled back and the push below
        // reports the divergence.
        if let Err(err) = self.run(&["pull", "--rebase", &self.remote, &self.branch]) {
            warn!(%err, "pull --rebase failed, continuing");
            let _ = self.run(&["rebase", "--abort"]);
        }

        self.run(&["push", &self.remote, &self.branch])?;
        info!(commit = message, "pushed");
        Ok(())
    }
}

/// The result of a publish operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed publish.
#[derive(Debug)]
pub enum Error {
    /// Returned when the `git` executable can't be started.
    Spawn(std::io::Error),

    /// Returned when a `git` command exits unsuccessfully.
    Command {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Spawn(err) => write!(f, "running git: {}", err),
            Error::Command {
                command,
                status,
                stderr,
            } => write!(f, "`git {}` failed ({}): {}", command, status, stderr),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Spawn(err) => Some(err),
            Error::Command { .. } => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_recorder_records_calls() -> Result<()> {
        let recorder = Recorder::default();
        recorder.publish("add article: a", &[Path::new("articles/a.html")])?;
        recorder.publish("mark done: a", &[])?;
        assert_eq!(vec!["add article: a", "mark done: a"], recorder.messages());
        assert_eq!(
            vec![PathBuf::from("articles/a.html")],
            recorder.calls()[0].1
        );
        Ok(())
    }

    #[test]
    fn test_git_reports_missing_repository() -> std::io::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let git = Git {
            root: dir.path().join("does-not-exist"),
            remote: String::from("origin"),
            branch: String::from("main"),
        };
        assert!(git.publish("add article: a", &[Path::new("a.html")]).is_err());
        Ok(())
    }

    fn git(root: &Path) -> Git {
        Git {
            root: root.to_owned(),
            remote: String::from("origin"),
            branch: String::from("main"),
        }
    }

    #[test]
    fn test_git_publish_rebases_onto_upstream() -> TestResult {
        let dir = tempfile::TempDir::new()?;
        let top = git(dir.path());
        top.run(&["init", "--bare", "remote.git"])?;
        git(&dir.path().join("remote.git")).run(&["symbolic-ref", "HEAD", "refs/heads/main"])?;

        top.run(&["clone", "remote.git", "a"])?;
        let a = git(&dir.path().join("a"));
        a.ensure_identity()?;
        a.run(&["symbolic-ref", "HEAD", "refs/heads/main"])?;
        std::fs::write(dir.path().join("a/seed.txt"), "seed")?;
        a.run(&["add", "seed.txt"])?;
        a.run(&["commit", "-m", "seed"])?;
        a.run(&["push", "-u", "origin", "main"])?;

        // Another clone pushes first, so `a` is behind when it publishes.
        top.run(&["clone", "-b", "main", "remote.git", "b"])?;
        let b = git(&dir.path().join("b"));
        b.ensure_identity()?;
        std::fs::write(dir.path().join("b/other.txt"), "other")?;
        b.publish("add other", &[Path::new("other.txt")])?;

        std::fs::write(dir.path().join("a/article.html"), "<p>x</p>")?;
        a.publish("add article: x", &[Path::new("article.html")])?;

        let log = git(&dir.path().join("remote.git")).run(&["log", "--format=%s", "main"])?;
        let subjects: Vec<&str> = log.lines().collect();
        assert_eq!(vec!["add article: x", "add other", "seed"], subjects);
        Ok(())
    }

    #[test]
    fn test_git_publish_without_changes_makes_no_commit() -> TestResult {
        let dir = tempfile::TempDir::new()?;
        let repo = git(dir.path());
        repo.run(&["init"])?;
        repo.ensure_identity()?;
        repo.run(&["symbolic-ref", "HEAD", "refs/heads/main"])?;
        std::fs::write(dir.path().join("a.html"), "a")?;
        repo.run(&["add", "a.html"])?;
        repo.run(&["commit", "-m", "first"])?;

        // No remote is configured, so reaching pull or push would fail.
        repo.publish("add article: a", &[Path::new("a.html")])?;
        assert_eq!("first", repo.run(&["log", "--format=%s"])?.trim());
        Ok(())
    }
}
