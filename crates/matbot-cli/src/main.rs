use anyhow::Context;
use clap::{value_parser, Arg, ArgMatches, Command};
use matbot_catalog::{CatalogStore, TaskId};
use matbot_core::{AdminSet, BotConfig, Dispatcher, ADMIN_IDS_VAR};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod console;

use console::{parse_line, ConsoleSink};

fn cli() -> Command {
    Command::new("matbot")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Task materials bot: console transport and catalog maintenance")
        .subcommand_required(true)
        .arg(
            Arg::new("data-file")
                .long("data-file")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Catalog document (overrides MATBOT_DATA_FILE)"),
        )
        .arg(
            Arg::new("admins")
                .long("admins")
                .global(true)
                .help("Comma-separated administrator ids (overrides ADMIN_IDS)"),
        )
        .subcommand(
            Command::new("serve")
                .about("Read JSON events from stdin, write outbound effects to stdout"),
        )
        .subcommand(Command::new("inventory").about("Print per-task file counts"))
        .subcommand(
            Command::new("show")
                .about("Print the stored references of one task")
                .arg(
                    Arg::new("task")
                        .required(true)
                        .help("Task number (1 to 19)"),
                ),
        )
        .subcommand(
            Command::new("check").about("Load the catalog and report malformed entries"),
        )
}

fn load_config(
    matches: &ArgMatches,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<BotConfig> {
    let admins_flag = matches.get_one::<String>("admins");
    // --admins replaces ADMIN_IDS outright, so a bad environment list is never parsed
    let mut config = BotConfig::from_lookup(|key| {
        if key == ADMIN_IDS_VAR && admins_flag.is_some() {
            None
        } else {
            env(key)
        }
    })
    .context("invalid environment configuration")?;

    if let Some(path) = matches.get_one::<PathBuf>("data-file") {
        config = config.with_data_file(path.clone());
    }
    if let Some(list) = admins_flag {
        config.admins = AdminSet::parse_list(list, "--admins")?;
    }
    Ok(config)
}

async fn serve(config: &BotConfig) -> anyhow::Result<()> {
    let dispatcher = Dispatcher::from_config(config);
    let stdout = Arc::new(tokio::sync::Mutex::new(tokio::io::stdout()));
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    serve_lines(&dispatcher, stdin, stdout).await
}

/// Handle events line by line until `input` is exhausted
///
/// Lines that are not UTF-8 or not an event are logged and skipped; only a
/// failing read ends the loop.
async fn serve_lines<R, W>(
    dispatcher: &Dispatcher,
    mut input: R,
    out: Arc<tokio::sync::Mutex<W>>,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                tracing::warn!("Skipping event line that is not UTF-8: {}", e);
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        let (from, event) = match parse_line(line) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Skipping malformed event line: {}", e);
                continue;
            }
        };

        let response = dispatcher.handle(from, event);
        let sink = ConsoleSink::new(from, out.clone());
        for report in response.realize(&sink).await {
            tracing::debug!(
                "Delivered {}/{} items for task {}",
                report.delivered(),
                report.attempted,
                report.task
            );
        }
    }

    tracing::info!("Input closed, shutting down");
    Ok(())
}

fn inventory(config: &BotConfig) {
    let store = CatalogStore::open(config.data_file.clone());
    let tasks = store.list_non_empty();
    if tasks.is_empty() {
        println!("No materials uploaded yet.");
        return;
    }
    for (task, count) in tasks {
        println!("Task {task}: {count} file(s)");
    }
}

fn show(config: &BotConfig, task: &str) -> anyhow::Result<()> {
    let task: TaskId = task.parse()?;
    let store = CatalogStore::open(config.data_file.clone());
    let items = store.get(task);
    if items.is_empty() {
        println!("No materials for task {task} yet.");
    }
    for (i, item) in items.iter().enumerate() {
        println!("{:>3}. {:<8} {}", i + 1, item.kind(), item.external_id());
    }
    Ok(())
}

fn check(config: &BotConfig) -> bool {
    let (store, report) = CatalogStore::open_with_report(config.data_file.clone());
    println!("Catalog: {}", store.path().display());
    println!("Source: {:?}", report.source);
    println!(
        "Tasks: {}, files: {}",
        store.list_non_empty().len(),
        store.snapshot().total_items()
    );
    for entry in &report.skipped {
        println!("  skipped {entry}");
    }
    println!("Status: {}", if report.is_clean() { "OK" } else { "PROBLEMS FOUND" });
    report.is_clean()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "matbot=info,matbot_core=info,matbot_catalog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let matches = cli().get_matches();
    let config = load_config(&matches, |key| std::env::var(key).ok())?;

    match matches.subcommand() {
        Some(("serve", _)) => serve(&config).await?,
        Some(("inventory", _)) => inventory(&config),
        Some(("show", args)) => {
            let task = args
                .get_one::<String>("task")
                .context("missing task argument")?;
            show(&config, task)?;
        }
        Some(("check", _)) => {
            if !check(&config) {
                std::process::exit(1);
            }
        }
        _ => {}
    }

    Ok(())
}
