use std::fmt;

use bite_core::model::{Feedback, Fingerprint, ItemId, Like, Rating};
use chrono::{DateTime, Duration, Utc};
use storage::repository::{Storage, StorageError};

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    item_id: ItemId,
    likes: u32,
    feedback: u32,
    now: Option<DateTime<Utc>>,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidItemId { raw: String },
    InvalidLikes { raw: String },
    InvalidFeedback { raw: String },
    InvalidDbUrl { raw: String },
    InvalidNow { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidItemId { raw } => write!(f, "invalid --item value: {raw:?}"),
            ArgsError::InvalidLikes { raw } => write!(f, "invalid --likes value: {raw}"),
            ArgsError::InvalidFeedback { raw } => write!(f, "invalid --feedback value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNow { raw } => {
                write!(f, "invalid --now value (expected RFC3339): {raw}")
            }
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

fn parse_count(
    value: String,
    err: impl FnOnce(String) -> ArgsError,
) -> Result<u32, ArgsError> {
    value.parse::<u32>().map_err(|_| err(value))
}

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("BITE_DB_URL").unwrap_or_else(|_| "sqlite://bite.sqlite3".into());
        let mut item_raw = std::env::var("BITE_SEED_ITEM").unwrap_or_else(|_| "intro".into());
        let mut likes = 3;
        let mut feedback = 2;
        let mut now: Option<DateTime<Utc>> = None;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--item" => item_raw = require_value(&mut args, "--item")?,
                "--likes" => {
                    let value = require_value(&mut args, "--likes")?;
                    likes = parse_count(value, |raw| ArgsError::InvalidLikes { raw })?;
                }
                "--feedback" => {
                    let value = require_value(&mut args, "--feedback")?;
                    feedback = parse_count(value, |raw| ArgsError::InvalidFeedback { raw })?;
                }
                "--now" => {
                    let value = require_value(&mut args, "--now")?;
                    let parsed = DateTime::parse_from_rfc3339(&value)
                        .map_err(|_| ArgsError::InvalidNow { raw: value.clone() })?
                        .with_timezone(&Utc);
                    now = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let item_id = ItemId::new(item_raw.clone())
            .map_err(|_| ArgsError::InvalidItemId { raw: item_raw })?;

        Ok(Self {
            db_url,
            item_id,
            likes,
            feedback,
            now,
        })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>   SQLite URL (default: sqlite://bite.sqlite3)");
    eprintln!("  --item <id>         Item id to attach rows to (default: intro)");
    eprintln!("  --likes <n>         Likes to insert, one per synthetic fingerprint (default: 3)");
    eprintln!("  --feedback <n>      Feedback rows to insert (default: 2)");
    eprintln!("  --now <rfc3339>     Timestamp for the newest row (default: current time)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  BITE_DB_URL, BITE_SEED_ITEM");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|err| {
        print_usage();
        err
    })?;
    let now = args.now.unwrap_or_else(Utc::now);
    let storage = Storage::sqlite(&args.db_url).await?;

    let mut inserted_likes = 0;
    for i in 0..args.likes {
        let Some(fingerprint) = Fingerprint::new(format!("seed_{i:04}")) else {
            continue;
        };
        let like = Like {
            item_id: args.item_id.clone(),
            fingerprint,
            created_at: now - Duration::minutes(i64::from(i)),
        };
        match storage.engagement.insert_like(&like).await {
            Ok(()) => inserted_likes += 1,
            Err(StorageError::Conflict) => {}
            Err(err) => return Err(err.into()),
        }
    }

    let comments = ["Short and clear", "Would like more examples", "Too fast"];
    for i in 0..args.feedback {
        let idx = (i as usize) % comments.len();
        let rating = Rating::new(u8::try_from(5 - i % 5).unwrap_or(Rating::MAX))?;
        let Some(fingerprint) = Fingerprint::new(format!("seed_{i:04}")) else {
            continue;
        };
        let feedback = Feedback::new(
            args.item_id.clone(),
            fingerprint,
            rating,
            Some(comments[idx].to_string()),
            now - Duration::hours(i64::from(i)),
        );
        storage.engagement.insert_feedback(&feedback).await?;
    }

    println!(
        "Seeded item {} with {} likes and {} feedback rows into {}",
        args.item_id, inserted_likes, args.feedback, args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
