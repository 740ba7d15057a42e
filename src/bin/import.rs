//! Collection import tool / 合集导入工具
//!
//! Reads a comma-delimited front/back file and loads it into the server
//! database as one collection. Media backfill is keyed by comment prefix.
//!
//! Usage:
//!   kbox-import <file> --name <name> [--description <text>] [--tags <tags>]
//!       [--created-by <user>] [--reverse] [--skip-errors]
//!       [--sound-prefix-front <p>] [--sound-prefix-back <p>]
//!       [--image-prefix-front <p>] [--image-prefix-back <p>]

use anyhow::{bail, Context, Result};
use sqlx::sqlite::SqlitePool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use knowledgebox_backend::config;
use knowledgebox_backend::db;
use knowledgebox_backend::import::{card_rows, import_collection, parse_delimited, ImportOptions};

struct Args {
    file: String,
    name: String,
    description: String,
    tags: String,
    skip_errors: bool,
    opts: ImportOptions,
}

fn usage() -> ! {
    eprintln!(
        "usage: kbox-import <file> --name <name> [--description <text>] [--tags <tags>]\n\
         \x20      [--created-by <user>] [--reverse] [--skip-errors]\n\
         \x20      [--sound-prefix-front <p>] [--sound-prefix-back <p>]\n\
         \x20      [--image-prefix-front <p>] [--image-prefix-back <p>]"
    );
    std::process::exit(2);
}

fn parse_args() -> Result<Args> {
    let mut argv = std::env::args().skip(1);
    let mut file = None;
    let mut name = None;
    let mut description = String::new();
    let mut tags = String::new();
    let mut skip_errors = false;
    let mut opts = ImportOptions::default();

    fn value(argv: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
        argv.next().with_context(|| format!("{} needs a value", flag))
    }

    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--name" => name = Some(value(&mut argv, "--name")?),
            "--description" => description = value(&mut argv, "--description")?,
            "--tags" => tags = value(&mut argv, "--tags")?,
            "--created-by" => opts.created_by = Some(value(&mut argv, "--created-by")?),
            "--reverse" => opts.reverse = true,
            "--skip-errors" => skip_errors = true,
            "--sound-prefix-front" => {
                opts.sound_prefix_front = Some(value(&mut argv, "--sound-prefix-front")?)
            }
            "--sound-prefix-back" => {
                opts.sound_prefix_back = Some(value(&mut argv, "--sound-prefix-back")?)
            }
            "--image-prefix-front" => {
                opts.image_prefix_front = Some(value(&mut argv, "--image-prefix-front")?)
            }
            "--image-prefix-back" => {
                opts.image_prefix_back = Some(value(&mut argv, "--image-prefix-back")?)
            }
            "--help" | "-h" => usage(),
            _ if arg.starts_with("--") => bail!("unknown flag: {}", arg),
            _ if file.is_none() => file = Some(arg),
            _ => bail!("unexpected argument: {}", arg),
        }
    }

    let Some(file) = file else { usage() };
    let Some(name) = name else { usage() };
    Ok(Args {
        file,
        name,
        description,
        tags,
        skip_errors,
        opts,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "knowledgebox_backend=info,import=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = parse_args()?;

    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file))?;
    let rows = parse_delimited(&text, 2, args.skip_errors)?;
    let cards = card_rows(&rows);

    let app_config = config::load_config().map_err(anyhow::Error::msg)?;
    let data_dir = app_config.get_data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
    }
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| app_config.get_database_url());
    let pool = SqlitePool::connect(&database_url).await?;
    db::run_migrations(&pool).await?;

    let id = import_collection(
        &pool,
        &args.name,
        &args.description,
        &args.tags,
        &cards,
        &args.opts,
    )
    .await?;

    println!("imported collection {} ({} cards read)", id, cards.len());
    Ok(())
}
