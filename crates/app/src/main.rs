use std::fmt;
use std::time::Duration;

use bite_core::model::{Catalog, ContentItem, ItemId, Rating};
use services::{
    AppServices, Clock, RemoteStoreConfig, SurfaceConfig, SurfaceController, WatchConfig,
    WatchEvent, WatchTracker,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { name: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidDbUrl { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { name } => write!(f, "missing <{name}>"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_number<T: std::str::FromStr>(flag: &'static str, raw: String) -> Result<T, ArgsError> {
    raw.parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app [options] progress");
    eprintln!("  app [options] complete <item>");
    eprintln!("  app [options] reset [--item <item>]");
    eprintln!("  app [options] catalog [--topic <tag>] [--search <text>]");
    eprintln!("  app [options] watch <item> [--for <seconds>]");
    eprintln!("  app [options] like <item>");
    eprintln!("  app [options] feedback <item> --rating <1-5> [--comment <text>]");
    eprintln!("  app [options] note <item> [<text>]");
    eprintln!("  app [options] analytics");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>       default sqlite://bite.sqlite3");
    eprintln!("  --catalog <path|url>    content list JSON");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  BITE_DB_URL, BITE_CATALOG, BITE_REMOTE_URL, BITE_REMOTE_KEY, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Progress,
    Complete { item: String },
    Reset { item: Option<String> },
    Catalog { topic: Option<String>, search: Option<String> },
    Watch { item: String, run_for: Option<u64> },
    Like { item: String },
    Feedback { item: String, rating: u8, comment: Option<String> },
    Note { item: String, text: Option<String> },
    Analytics,
}

#[derive(Debug, Clone, PartialEq)]
struct Args {
    db_url: String,
    catalog: Option<String>,
    command: Command,
}

impl Args {
    fn parse(argv: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("BITE_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://bite.sqlite3".into(), normalize_sqlite_url);
        let mut catalog = std::env::var("BITE_CATALOG").ok();

        let mut positional = Vec::new();
        let mut item_flag = None;
        let mut topic = None;
        let mut search = None;
        let mut run_for = None;
        let mut rating = None;
        let mut comment = None;

        let mut args = argv.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--catalog" => catalog = Some(require_value(&mut args, "--catalog")?),
                "--item" => item_flag = Some(require_value(&mut args, "--item")?),
                "--topic" => topic = Some(require_value(&mut args, "--topic")?),
                "--search" => search = Some(require_value(&mut args, "--search")?),
                "--for" => {
                    run_for = Some(parse_number("--for", require_value(&mut args, "--for")?)?);
                }
                "--rating" => {
                    rating = Some(parse_number(
                        "--rating",
                        require_value(&mut args, "--rating")?,
                    )?);
                }
                "--comment" => comment = Some(require_value(&mut args, "--comment")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                flag if flag.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let item = |value: Option<String>| value.ok_or(ArgsError::MissingArgument { name: "item" });
        let command = match positional.next().as_deref() {
            None | Some("progress") => Command::Progress,
            Some("complete") => Command::Complete {
                item: item(positional.next())?,
            },
            Some("reset") => Command::Reset { item: item_flag },
            Some("catalog") => Command::Catalog { topic, search },
            Some("watch") => Command::Watch {
                item: item(positional.next())?,
                run_for,
            },
            Some("like") => Command::Like {
                item: item(positional.next())?,
            },
            Some("feedback") => Command::Feedback {
                item: item(positional.next())?,
                rating: rating.ok_or(ArgsError::MissingValue { flag: "--rating" })?,
                comment,
            },
            Some("note") => {
                let item = item(positional.next())?;
                let rest: Vec<String> = positional.by_ref().collect();
                Command::Note {
                    item,
                    text: (!rest.is_empty()).then(|| rest.join(" ")),
                }
            }
            Some("analytics") => Command::Analytics,
            Some(other) => return Err(ArgsError::UnknownCommand(other.to_string())),
        };
        if let Some(extra) = positional.next() {
            return Err(ArgsError::UnknownArg(extra));
        }

        Ok(Self {
            db_url,
            catalog,
            command,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn parse_item(raw: &str) -> Result<ItemId, bite_core::Error> {
    Ok(ItemId::new(raw)?)
}

fn parse_rating(raw: u8) -> Result<Rating, bite_core::Error> {
    Ok(Rating::new(raw)?)
}

async fn load_catalog(
    app: &AppServices,
    source: Option<&str>,
) -> Result<Catalog, Box<dyn std::error::Error>> {
    let source = source.ok_or("no content list configured (use --catalog or BITE_CATALOG)")?;
    Ok(app.catalog().load(source).await?)
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1)).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let remote = RemoteStoreConfig::from_env()?;
    let app = AppServices::new_sqlite(&args.db_url, Clock::default_clock(), remote).await?;
    let progress = app.progress();

    match args.command {
        Command::Progress => {
            let catalog = match args.catalog.as_deref() {
                Some(source) => Some(load_catalog(&app, Some(source)).await?),
                None => None,
            };
            for record in progress.records() {
                let name = catalog
                    .as_ref()
                    .and_then(|c| c.get(record.item_id()))
                    .map_or("", |item| item.name());
                let mark = if record.is_completed() { "done" } else { "" };
                let seen = record.last_observed_at().map_or_else(
                    || "-".to_string(),
                    |at| format!("{}m ago", app.clock().seconds_since(at) / 60),
                );
                println!(
                    "{:<24} {:>6.1}% {:>7.0}s {mark:<4} {seen:>10} {name}",
                    record.item_id().as_str(),
                    record.percentage(),
                    record.watched_seconds(),
                );
            }
            println!("{} completed", progress.completed_count());
        }
        Command::Complete { item } => {
            let item_id = parse_item(&item)?;
            progress.mark_completed(&item_id).await;
            println!("{item_id} marked completed");
        }
        Command::Reset { item: Some(item) } => {
            let item_id = parse_item(&item)?;
            if progress.reset_one(&item_id).await {
                println!("progress for {item_id} cleared");
            } else {
                println!("no progress recorded for {item_id}");
            }
        }
        Command::Reset { item: None } => {
            progress.reset_all().await;
            println!("all progress cleared");
        }
        Command::Catalog { topic, search } => {
            let catalog = load_catalog(&app, args.catalog.as_deref()).await?;
            let items = match (topic.as_deref(), search.as_deref()) {
                (Some(topic), _) => catalog.with_topic(topic),
                (None, Some(query)) => catalog.search(query),
                (None, None) => catalog.items().iter().collect(),
            };
            for item in items {
                let mark = if progress.is_completed(item.item_id()) { "*" } else { " " };
                println!(
                    "{mark} {:<24} {} [{}]",
                    item.item_id().as_str(),
                    item.name(),
                    item.topic_tags().join(", ")
                );
            }
            println!("topics: {}", catalog.topics().join(", "));
        }
        Command::Watch { item, run_for } => {
            let catalog = load_catalog(&app, args.catalog.as_deref()).await?;
            let item_id = parse_item(&item)?;
            let item = catalog
                .get(&item_id)
                .ok_or_else(|| format!("unknown item: {item_id}"))?;
            watch(&app, &catalog, item, run_for).await;
        }
        Command::Like { item } => {
            let item_id = parse_item(&item)?;
            let engagement = app.engagement();
            if engagement.like(&item_id).await {
                let count = engagement.like_count(&item_id).await.unwrap_or_default();
                println!("liked {item_id} ({count} total)");
            } else {
                println!("like could not be recorded");
            }
        }
        Command::Feedback {
            item,
            rating,
            comment,
        } => {
            let item_id = parse_item(&item)?;
            let rating = parse_rating(rating)?;
            if app
                .engagement()
                .submit_feedback(&item_id, rating, comment)
                .await
            {
                println!("thanks for the feedback");
            } else {
                println!("feedback could not be recorded");
            }
        }
        Command::Note { item, text } => {
            let item_id = parse_item(&item)?;
            let notes = app.notes();
            if let Some(text) = text {
                if notes.save(&item_id, &text).await?.is_none() {
                    println!("note for {item_id} removed");
                    return Ok(());
                }
            }
            match notes.render_html(&item_id) {
                Some(html) => println!("{html}"),
                None => println!("no note for {item_id}"),
            }
        }
        Command::Analytics => {
            let report = match app.analytics() {
                Some(analytics) => analytics.report().await,
                None => None,
            };
            let Some(report) = report else {
                println!("analytics unavailable");
                return Ok(());
            };
            println!(
                "likes: {}  feedback: {}  viewers: {}",
                report.total_likes, report.total_feedback, report.unique_viewers
            );
            for summary in &report.items {
                let average = summary
                    .average_rating
                    .map_or_else(|| "-".to_string(), |avg| format!("{avg:.1}"));
                println!(
                    "{:<24} {:>5} likes {:>5} ratings  avg {average}",
                    summary.item_id.as_str(),
                    summary.likes,
                    summary.feedback_count
                );
            }
            for row in &report.recent_comments {
                if let Some(comment) = &row.comment {
                    println!("{} {}: {comment}", row.created_at.format("%F %R"), row.item_id);
                }
            }
        }
    }
    Ok(())
}

/// Simulated watch: the surface comes up (embedded sources load at once) and
/// the viewer stays engaged until auto-advance or `run_for` seconds pass.
async fn watch(
    app: &AppServices,
    catalog: &Catalog,
    item: &ContentItem,
    run_for: Option<u64>,
) {
    let surface = SurfaceController::new(item.source_url().clone(), SurfaceConfig::default());
    let state = surface.start();
    info!(item = %item.item_id(), ?state, "surface started");
    if !surface.uses_estimator() {
        surface.fallback_loaded();
    }

    let config = WatchConfig::default();
    let next = catalog
        .next_after(item.item_id())
        .map(|next| next.item_id().clone());
    let (tracker, mut events) = WatchTracker::start(app.progress(), item, next, config);
    tracker.set_engaged(true);

    let deadline = async {
        match run_for {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            () = &mut deadline => {
                println!("stopped");
                break;
            }
            event = events.recv() => match event {
                Some(WatchEvent::Progress { percentage, .. }) => println!("{percentage:>6.1}%"),
                Some(WatchEvent::Completed { item_id }) => println!("{item_id} completed"),
                Some(WatchEvent::Looped { count, .. }) => println!("loop {count}"),
                Some(WatchEvent::AutoAdvance { next, .. }) => {
                    println!("up next: {next}");
                    break;
                }
                None => break,
            },
        }
    }
    tracker.stop();

    match app.progress().get_progress(item.item_id()) {
        Some(record) => println!(
            "{}: {:.1}% after {:.0}s watched",
            record.item_id(),
            record.percentage(),
            record.watched_seconds()
        ),
        None => warn!(item = %item.item_id(), "no progress recorded"),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(raw.iter().map(ToString::to_string))
    }

    #[test]
    fn defaults_to_progress() {
        assert_eq!(args(&[]).unwrap().command, Command::Progress);
    }

    #[test]
    fn parses_flags_around_subcommand() {
        let parsed = args(&["--db", "sqlite::memory:", "watch", "intro", "--for", "30"]).unwrap();
        assert_eq!(parsed.db_url, "sqlite::memory:");
        assert_eq!(
            parsed.command,
            Command::Watch {
                item: "intro".into(),
                run_for: Some(30)
            }
        );
    }

    #[test]
    fn note_joins_remaining_words() {
        let parsed = args(&["note", "intro", "key", "idea"]).unwrap();
        assert_eq!(
            parsed.command,
            Command::Note {
                item: "intro".into(),
                text: Some("key idea".into())
            }
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            args(&["complete"]),
            Err(ArgsError::MissingArgument { name: "item" })
        ));
        assert!(matches!(
            args(&["feedback", "intro"]),
            Err(ArgsError::MissingValue { flag: "--rating" })
        ));
        assert!(matches!(
            args(&["--for", "soon", "watch", "a"]),
            Err(ArgsError::InvalidNumber { flag: "--for", .. })
        ));
        assert!(matches!(args(&["dance"]), Err(ArgsError::UnknownCommand(_))));
    }

    #[test]
    fn domain_validation_errors_surface() {
        assert!(matches!(parse_item("  "), Err(bite_core::Error::ItemId(_))));
        assert!(matches!(parse_rating(9), Err(bite_core::Error::Rating(_))));
    }
}
