//! Binary entrypoint for the payuppal CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and create the sessions directory
//! - `play [--session <key>] [--bot-name <name>]` - drive a session from stdin, one
//!   `<user_id>:<name> /command [args]` line per message
//! - `show <key>` - print the stored board and players for a session
//! - `status` - list stored sessions and print process counters
//!
//! See the library crate docs for module-level details: `payuppal::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use payuppal::chat::{CommandParser, SessionRegistry};
use payuppal::config::Config;
use payuppal::game::{GameSession, UserId};
use payuppal::storage::{JsonFileStore, SessionStore};

#[derive(Parser)]
#[command(name = "payuppal")]
#[command(about = "A property-trading board game played through chat commands")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Read chat lines from stdin and play them against a stored session
    Play {
        /// Session key (chat id)
        #[arg(short, long, default_value = "local")]
        session: String,
        /// Only accept `/cmd@name` suffixes addressed to this bot
        #[arg(long)]
        bot_name: Option<String>,
    },
    /// Print the stored board and players of a session
    Show {
        /// Session key (chat id)
        key: String,
    },
    /// List stored sessions and counters
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => match Config::load(&cli.config).await {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                eprintln!("{} (using defaults)", e);
                None
            }
        },
    };
    init_logging(&pre_config, cli.verbose);
    let config = pre_config.unwrap_or_default();

    match cli.command {
        Commands::Init => {
            info!("Initializing new payuppal configuration");
            Config::create_default(&cli.config).await?;
            let cfg = Config::default();
            tokio::fs::create_dir_all(cfg.storage.sessions_dir()).await?;
            info!("Configuration file created at {}", cli.config);
            info!(
                "Session documents will be stored in {}",
                cfg.storage.sessions_dir().display()
            );
        }
        Commands::Play { session, bot_name } => {
            info!("Starting payuppal v{}", env!("CARGO_PKG_VERSION"));
            let store = JsonFileStore::open(config.storage.sessions_dir())?;
            let registry = SessionRegistry::new(store, config.game.clone());
            let parser = match bot_name {
                Some(name) => CommandParser::with_bot_name(&name),
                None => CommandParser::new(),
            };
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                if line.trim().is_empty() {
                    continue;
                }
                let Some((id, name, text)) = parse_play_line(&line) else {
                    warn!(
                        "ignoring malformed line: {}",
                        payuppal::logutil::escape_log(&line)
                    );
                    continue;
                };
                let mut replies: Vec<String> = Vec::new();
                let result = registry
                    .execute(&session, id, name, parser.parse(text), &mut replies)
                    .await;
                debug!("{} -> {}", id, payuppal::logutil::first_line(&replies));
                for reply in &replies {
                    println!("{}", reply);
                }
                if let Err(e) = result {
                    warn!("{}", e);
                }
            }
        }
        Commands::Show { key } => {
            let store = JsonFileStore::open(config.storage.sessions_dir())?;
            let doc = store
                .load(&key)?
                .ok_or_else(|| anyhow!("No stored session for {}", key))?;
            let session = GameSession::from_document(&doc, config.game.clone())?;
            let mut out: Vec<String> = Vec::new();
            session.show_board(&mut out);
            session.show_players(&mut out);
            println!("{}", out.join("\n"));
        }
        Commands::Status => {
            let store = JsonFileStore::open(config.storage.sessions_dir())?;
            let keys = store.keys()?;
            println!("Sessions in {}: {}", store.dir().display(), keys.len());
            for key in keys {
                match store.load(&key) {
                    Ok(Some(doc)) => println!(
                        "  {}: {} player(s), {}",
                        key,
                        doc.players.len(),
                        if doc.started { "in progress" } else { "not started" }
                    ),
                    Ok(None) => {}
                    Err(e) => println!("  {}: unreadable ({})", key, e),
                }
            }
            let counters = payuppal::metrics::snapshot();
            println!(
                "Counters: commands={} games_started={} games_won={} bankruptcies={} save_failures={}",
                counters.commands_handled(),
                counters.games_started,
                counters.games_won,
                counters.bankruptcies,
                counters.save_failures
            );
        }
    }

    Ok(())
}

/// Split `<user_id>:<name> <text>` into its parts.
fn parse_play_line(line: &str) -> Option<(UserId, &str, &str)> {
    let (who, text) = line.trim().split_once(char::is_whitespace)?;
    let (id, name) = who.split_once(':')?;
    let id = id.parse::<i64>().ok()?;
    Some((UserId(id), name, text.trim()))
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match (verbosity, config) {
        (0, Some(cfg)) => cfg.logging.level_filter(),
        (0, None) => log::LevelFilter::Info,
        (1, _) => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });
    match log_file {
        Some(f) => {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // Echo to the console only when stderr is a terminal
            let is_tty = atty::is(atty::Stream::Stderr);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_lines() {
        assert_eq!(
            parse_play_line("42:alice /sell Taipei"),
            Some((UserId(42), "alice", "/sell Taipei"))
        );
        assert_eq!(parse_play_line("alice /roll"), None);
        assert_eq!(parse_play_line("x:alice /roll"), None);
        assert_eq!(parse_play_line("42:alice"), None);
    }
}
