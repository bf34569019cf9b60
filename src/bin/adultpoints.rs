//! adultpoints CLI — point ledger bot.
//!
//! Usage:
//!   adultpoints serve [--db path]
//!   adultpoints say --user-id ID --name NAME [--bot] <text>... [--db path]
//!   adultpoints adults [--db path]

use adultpoints::{
    Config, IncomingMessage, OpenStore, Outbox, PointsApi, SenderType, SqliteStore, StdoutOutbox,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "adultpoints",
    version,
    about = "Peer-moderated point ledger for group chats"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Path to SQLite database file (overrides ADULTPOINTS_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read chat messages as JSON lines on stdin and write replies to stdout
    Serve,
    /// Handle a single chat message
    Say {
        /// Chat user id of the sender
        #[arg(long)]
        user_id: String,
        /// Display name of the sender
        #[arg(long)]
        name: String,
        /// Mark the sender as a bot
        #[arg(long)]
        bot: bool,
        /// Message text, e.g. `!adultme for doing laundry`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        text: Vec<String>,
    },
    /// Print the leaderboard
    Adults,
}

fn open_api(db: Option<PathBuf>) -> Result<PointsApi, String> {
    let mut config = Config::load().map_err(|e| format!("Invalid configuration: {}", e))?;
    if let Some(path) = db {
        config = config.with_db_path(path);
    }
    let store = SqliteStore::open(&config.db_path).map_err(|e| format!("Failed to open database: {}", e))?;
    info!(path = %config.db_path.display(), "opened points database");
    Ok(PointsApi::new(Arc::new(store), config))
}

fn cmd_say(api: &PointsApi, user_id: String, name: String, bot: bool, text: Vec<String>) -> i32 {
    let sender_type = if bot { SenderType::Bot } else { SenderType::User };
    let message = IncomingMessage::new(user_id, name, text.join(" ")).with_sender_type(sender_type);
    let replies = api.handle(&message);
    if replies.is_empty() {
        eprintln!("Error: not a points command");
        return 1;
    }
    for reply in replies {
        println!("{}", reply.text);
    }
    0
}

fn cmd_adults(api: &PointsApi) -> i32 {
    match api.leaderboard().render() {
        Ok(board) => {
            println!("{}", board);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_serve(api: PointsApi) -> i32 {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            return 1;
        }
    };

    rt.block_on(async move {
        let outbox: Arc<dyn Outbox> = Arc::new(StdoutOutbox);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut tasks = JoinSet::new();

        info!("serving commands from stdin");
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    eprintln!("failed to read stdin: {}", e);
                    return 1;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            let message: IncomingMessage = match serde_json::from_str(&line) {
                Ok(m) => m,
                Err(e) => {
                    warn!(error = %e, "skipping malformed message");
                    continue;
                }
            };

            // One task per command; they only meet in the store.
            let api = api.clone();
            let outbox = outbox.clone();
            tasks.spawn(async move {
                if let Err(e) = api.respond(message, outbox.as_ref()).await {
                    warn!(error = %e, "failed to deliver replies");
                }
            });
        }

        while tasks.join_next().await.is_some() {}
        info!("stdin closed, shutting down");
        0
    })
}

fn main() {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let api = match open_api(cli.db) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Serve => cmd_serve(api),
        Commands::Say {
            user_id,
            name,
            bot,
            text,
        } => cmd_say(&api, user_id, name, bot, text),
        Commands::Adults => cmd_adults(&api),
    };
    std::process::exit(code);
}
