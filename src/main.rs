use anyhow::{Context, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use rowpress::affiliate::Patcher;
use rowpress::article::Renderer;
use rowpress::build::build_indexes;
use rowpress::config::Config;
use rowpress::dates::Markers;
use rowpress::publish::{now, Outcome, Publisher};
use rowpress::scan::site_pages;
use rowpress::sheet::Sheet;
use rowpress::theme::Theme;
use rowpress::vcs::{Git, Offline, Publish};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pause = Arg::with_name("pause")
        .long("pause")
        .value_name("SECONDS")
        .takes_value(true)
        .help("Seconds to wait between two publications (overrides pause_seconds)");

    let matches = App::new("rowpress")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Publishes article pages from a keyword sheet and maintains the site's indexes")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(
            Arg::with_name("project")
                .short("p")
                .long("project")
                .value_name("DIR")
                .takes_value(true)
                .help("A directory inside the project (defaults to the working directory)"),
        )
        .arg(
            Arg::with_name("offline")
                .long("offline")
                .help("Write files without committing or pushing them"),
        )
        .subcommand(
            SubCommand::with_name("publish")
                .about("Publishes every enabled, unpublished row of the keyword sheet")
                .arg(pause.clone()),
        )
        .subcommand(
            SubCommand::with_name("index")
                .about("Rebuilds the sitemap, feed, and all-articles listing"),
        )
        .subcommand(SubCommand::with_name("dates").about("Refreshes the daily date markers"))
        .subcommand(
            SubCommand::with_name("patch-links")
                .about("Adds rel=\"nofollow noopener sponsored\" to affiliate links"),
        )
        .subcommand(
            SubCommand::with_name("all")
                .about("Publishes, refreshes dates, patches links, and rebuilds the indexes")
                .arg(pause),
        )
        .get_matches();

    let directory = match matches.value_of("project") {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir().context("getting the working directory")?,
    };
    let mut config = Config::from_directory(&directory)
        .with_context(|| format!("loading project from '{}'", directory.display()))?;
    if matches.is_present("offline") {
        config.git.enabled = false;
    }
    let vcs = vcs(&config)?;

    match matches.subcommand() {
        ("publish", Some(m)) => publish(&config, vcs.as_ref(), pause_for(m, &config)?),
        ("index", _) => index(&config, vcs.as_ref()),
        ("dates", _) => dates(&config, vcs.as_ref()),
        ("patch-links", _) => patch_links(&config, vcs.as_ref()),
        ("all", Some(m)) => {
            publish(&config, vcs.as_ref(), pause_for(m, &config)?)?;
            dates(&config, vcs.as_ref())?;
            patch_links(&config, vcs.as_ref())?;
            index(&config, vcs.as_ref())
        }
        (name, _) => anyhow::bail!("unknown command `{}`", name),
    }
}

fn vcs(config: &Config) -> Result<Box<dyn Publish>> {
    if !config.git.enabled {
        return Ok(Box::new(Offline));
    }
    let git = Git {
        root: config.root_directory.clone(),
        remote: config.git.remote.clone(),
        branch: config.git.branch.clone(),
    };
    git.ensure_identity().context("configuring git identity")?;
    Ok(Box::new(git))
}

fn pause_for(matches: &ArgMatches, config: &Config) -> Result<Duration> {
    let seconds = match matches.value_of("pause") {
        Some(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("--pause expects whole seconds, got `{}`", raw))?,
        None => config.pause_seconds,
    };
    Ok(Duration::from_secs(seconds))
}

fn publish(config: &Config, vcs: &dyn Publish, pause: Duration) -> Result<()> {
    let theme = Theme::load(config).context("loading theme")?;
    let mut sheet = Sheet::open(&config.keywords_path, config.conventions.clone())
        .context("loading keyword sheet")?;
    let records = sheet.records();

    let renderer = Renderer {
        template: &theme.article,
        home_page: &config.site_root,
        articles_url: &config.articles_url,
        listing_url: &config.listing_url,
        description_length: config.description_length,
    };
    let publisher = Publisher {
        renderer: &renderer,
        output_directory: &config.articles_directory,
        vcs,
        pause,
        sleep: &std::thread::sleep,
        offset: config.offset,
    };
    let report = publisher.run(&records, &mut sheet)?;

    info!(
        published = report.count(Outcome::Published),
        regenerated = report.count(Outcome::Regenerated),
        adopted = report.count(Outcome::Adopted),
        disabled = report.count(Outcome::Disabled),
        already_published = report.count(Outcome::AlreadyPublished),
        duplicates = report.count(Outcome::Duplicate),
        "publish finished"
    );
    Ok(())
}

fn index(config: &Config, vcs: &dyn Publish) -> Result<()> {
    let theme = Theme::load(config).context("loading theme")?;
    let documents = build_indexes(config, &theme)?;
    info!(pages = documents.len(), "indexes rebuilt");
    commit(
        vcs,
        "update sitemap, feed, and listing",
        &[
            config.listing_path.clone(),
            config.sitemap_path.clone(),
            config.feed_path.clone(),
        ],
    )
}

fn dates(config: &Config, vcs: &dyn Publish) -> Result<()> {
    let mut pages = site_pages(&config.root_directory, &config.articles_directory)?;
    pages.retain(|page| *page != config.listing_path);
    let changed = Markers::new()?.refresh_files(&pages, &now(config.offset))?;
    info!(files = changed.len(), "dates refreshed");
    commit(vcs, "refresh daily dates", &changed)
}

fn patch_links(config: &Config, vcs: &dyn Publish) -> Result<()> {
    let pages = site_pages(&config.root_directory, &config.articles_directory)?;
    let changed = Patcher::new(&config.affiliate_links)?.patch_files(&pages)?;
    info!(files = changed.len(), "affiliate links patched");
    commit(vcs, "mark affiliate links", &changed)
}

fn commit(vcs: &dyn Publish, message: &str, paths: &[PathBuf]) -> Result<()> {
    if paths.is_empty() {
        return Ok(());
    }
    let paths: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
    vcs.publish(message, &paths)
        .with_context(|| format!("publishing `{}`", message))
}
