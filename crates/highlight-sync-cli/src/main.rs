use anyhow::{Context, Result, anyhow};
use highlight_sync_config::Config;
use highlight_sync_engine::{
    ContentTree, HighlightError, HighlightStore, SyncCoordinator, SyncOutcome, TextOffsets,
    find_whitespace_insensitive, io::selection_for_offsets,
};
use highlight_sync_http::HttpHighlightStore;
use std::{
    env,
    io::{Write, stdout},
    path::{Path, PathBuf},
    process,
    sync::Arc,
};

const USAGE: &str = "\
Commands:
  show   <message-id> <file.md>
  add    <message-id> <file.md> <start> <end> [color]
  mark   <message-id> <file.md> <text> [color]
  remove <message-id> <file.md> <start> <end>
  clear  <message-id>
  exists <message-id>";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Show {
        message_id: String,
        file: PathBuf,
    },
    Add {
        message_id: String,
        file: PathBuf,
        start: usize,
        end: usize,
        color: Option<String>,
    },
    Mark {
        message_id: String,
        file: PathBuf,
        text: String,
        color: Option<String>,
    },
    Remove {
        message_id: String,
        file: PathBuf,
        start: usize,
        end: usize,
    },
    Clear {
        message_id: String,
    },
    Exists {
        message_id: String,
    },
}

fn parse_offset(value: &str, name: &str) -> Result<usize, String> {
    value
        .parse()
        .map_err(|_| format!("<{name}> must be a character offset, got '{value}'"))
}

/// Parse everything after the program name.
fn parse_args(args: &[String]) -> Result<Command, String> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    let command = match args.as_slice() {
        ["show", id, file] => Command::Show {
            message_id: id.to_string(),
            file: PathBuf::from(file),
        },
        ["add", id, file, start, end, rest @ ..] if rest.len() <= 1 => Command::Add {
            message_id: id.to_string(),
            file: PathBuf::from(file),
            start: parse_offset(start, "start")?,
            end: parse_offset(end, "end")?,
            color: rest.first().map(|color| color.to_string()),
        },
        ["mark", id, file, text, rest @ ..] if rest.len() <= 1 => Command::Mark {
            message_id: id.to_string(),
            file: PathBuf::from(file),
            text: text.to_string(),
            color: rest.first().map(|color| color.to_string()),
        },
        ["remove", id, file, start, end] => Command::Remove {
            message_id: id.to_string(),
            file: PathBuf::from(file),
            start: parse_offset(start, "start")?,
            end: parse_offset(end, "end")?,
        },
        ["clear", id] => Command::Clear {
            message_id: id.to_string(),
        },
        ["exists", id] => Command::Exists {
            message_id: id.to_string(),
        },
        [] => return Err("No command given".to_string()),
        [name, ..] => return Err(format!("Unknown command or wrong arguments for '{name}'")),
    };
    Ok(command)
}

fn mount(
    message_id: &str,
    file: &Path,
    store: &Arc<dyn HighlightStore>,
    config: &Config,
) -> Result<SyncCoordinator> {
    let markdown = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read message file {}", file.display()))?;
    Ok(SyncCoordinator::new(
        message_id,
        ContentTree::from_markdown(&markdown),
        Arc::clone(store),
        config.sync_options(),
    ))
}

/// Print the repainted message, or the notice if the store was not updated.
fn report(outcome: SyncOutcome, sync: &SyncCoordinator, out: &mut dyn Write) -> Result<()> {
    if let SyncOutcome::KeptLocal { notice } = &outcome {
        eprintln!("Warning: {}", notice.message);
    }
    writeln!(out, "{}", sync.html())?;
    Ok(())
}

async fn run(
    command: Command,
    store: Arc<dyn HighlightStore>,
    config: &Config,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Command::Show { message_id, file } => {
            let mut sync = mount(&message_id, &file, &store, config)?;
            let outcome = sync.load().await;
            report(outcome, &sync, out)
        }
        Command::Add {
            message_id,
            file,
            start,
            end,
            color,
        } => {
            let mut sync = mount(&message_id, &file, &store, config)?;
            sync.load().await;
            let selection = selection_for_offsets(sync.tree(), sync.root(), start, end)
                .ok_or_else(|| anyhow!("Offsets {start}..{end} are outside the message text"))?;
            let outcome = sync.request_highlight(&selection, color.as_deref()).await?;
            report(outcome, &sync, out)
        }
        Command::Mark {
            message_id,
            file,
            text,
            color,
        } => {
            let mut sync = mount(&message_id, &file, &store, config)?;
            sync.load().await;
            let plain = sync.tree().plain_text(sync.root());
            let offsets = find_whitespace_insensitive(&plain, &text)
                .ok_or_else(|| HighlightError::NotFound { text: text.clone() })?;
            let selection =
                selection_for_offsets(sync.tree(), sync.root(), offsets.start, offsets.end)
                    .ok_or_else(|| HighlightError::NotFound { text })?;
            let outcome = sync.request_highlight(&selection, color.as_deref()).await?;
            report(outcome, &sync, out)
        }
        Command::Remove {
            message_id,
            file,
            start,
            end,
        } => {
            let mut sync = mount(&message_id, &file, &store, config)?;
            sync.load().await;
            let text: String = sync
                .tree()
                .plain_text(sync.root())
                .chars()
                .skip(start)
                .take(end.saturating_sub(start))
                .collect();
            let outcome = sync
                .request_unhighlight(TextOffsets::ordered(start, end), Some(text.as_str()))
                .await;
            report(outcome, &sync, out)
        }
        Command::Clear { message_id } => {
            if store.clear_highlights(&message_id).await? {
                writeln!(out, "Cleared highlights for {message_id}")?;
            } else {
                writeln!(out, "No highlights stored for {message_id}")?;
            }
            Ok(())
        }
        Command::Exists { message_id } => {
            let exists = store.highlights_exist(&message_id).await?;
            writeln!(out, "{exists}")?;
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map_or("highlight-sync-cli", String::as_str);
    let command = match parse_args(args.get(1..).unwrap_or_default()) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Usage: {program} <command> ...");
            eprintln!("{USAGE}");
            process::exit(1);
        }
    };

    let config_path = Config::config_path();
    let config = match Config::load() {
        Ok(Some(config)) => {
            log::info!("Loaded config from {}", config_path.display());
            config
        }
        Ok(None) => {
            log::info!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Config::default()
        }
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    let store = HttpHighlightStore::builder(config.api_base_url.clone())
        .request_timeout(config.request_timeout())
        .build()?;
    log::info!("Using highlights API at {}", store.base_url());

    run(command, Arc::new(store), &config, &mut stdout()).await
}
