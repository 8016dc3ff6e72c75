//! Binary entrypoint for the mushshop CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and seed the world store
//! - `play --user <name>` - interactive session on stdin/stdout
//! - `exec --user <name> <command...>` - run a single command and print the reply
//! - `status [--json]` - print record counts for the world store
//!
//! See the library crate docs for module-level details: `mushshop::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use mushshop::config::Config;
use mushshop::logutil::escape_log;
use mushshop::tmush::{TinyMushCommand, TinyMushProcessor, TinyMushStore};

#[derive(Parser)]
#[command(name = "mushshop")]
#[command(about = "Shops and storerooms for a TinyMUSH world")]
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
    /// Write a default configuration and seed the world
    Init,
    /// Play interactively as a user
    Play {
        /// Character name
        #[arg(short, long)]
        user: String,
    },
    /// Run one command as a user and print the reply
    Exec {
        /// Character name
        #[arg(short, long)]
        user: String,
        /// The command line, e.g. `@buildshop Bob`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Show world statistics
    Status {
        /// Print the counts as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Missing config falls back to defaults so a fresh checkout can play immediately.
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => match Config::load(&cli.config).await {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("{}; using defaults", e);
                None
            }
        },
    };
    init_logging(&pre_config, cli.verbose);
    let config = pre_config.unwrap_or_default();

    match cli.command {
        Commands::Init => {
            info!("Initializing new mushshop configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);

            let config = Config::load(&cli.config).await?;
            let store = TinyMushStore::open(&config.world.db_path)?;
            let stats = store.stats()?;
            println!(
                "Created {} and world store at {} ({} rooms).",
                cli.config, config.world.db_path, stats.rooms
            );
        }
        Commands::Play { user } => {
            let processor = open_processor(config)?;
            run_repl(&processor, &user).await?;
        }
        Commands::Exec { user, command } => {
            let processor = open_processor(config)?;
            let line = command.join(" ");
            println!("{}", processor.handle_line(&user, &line));
        }
        Commands::Status { json } => {
            let store = TinyMushStore::open(&config.world.db_path)?;
            let stats = store.stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
                return Ok(());
            }
            println!("mushshop v{}", env!("CARGO_PKG_VERSION"));
            println!("World store: {}", config.world.db_path);
            println!("Rooms:   {}", stats.rooms);
            println!("Exits:   {}", stats.exits);
            println!("Objects: {}", stats.objects);
            println!("Players: {}", stats.players);
        }
    }

    Ok(())
}

fn open_processor(config: Config) -> Result<TinyMushProcessor> {
    let store = TinyMushStore::open(&config.world.db_path)?;
    info!("World store opened at {}", config.world.db_path);
    Ok(TinyMushProcessor::new(store, config))
}

/// Read commands from stdin until EOF, or until `quit` is typed outside a shop menu.
async fn run_repl(processor: &TinyMushProcessor, user: &str) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let greeting = processor.handle_line(user, "look");
    let banner = format!("Welcome, {}. Type HELP for commands.\n\n{}\n> ", user, greeting);
    stdout.write_all(banner.as_bytes()).await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let leaving = match processor.is_in_menu(user) {
            Ok(in_menu) => !in_menu && processor.parse_command(&line) == TinyMushCommand::Quit,
            Err(e) => {
                warn!("menu state unavailable for {}: {}", escape_log(user), e);
                false
            }
        };

        let reply = processor.handle_line(user, &line);
        stdout.write_all(format!("{}\n", reply).as_bytes()).await?;
        if leaving {
            break;
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    stdout.flush().await?;
    info!("Session ended for {}", escape_log(user));
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let configured = config
        .as_ref()
        .and_then(|cfg| cfg.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    let base_level = match verbosity {
        0 => configured,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config.as_ref().and_then(|cfg| cfg.logging.file.clone());
    let opened = log_file.as_ref().and_then(|file| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .ok()
    });

    if let Some(f) = opened {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only when stdout is a terminal
        let is_tty = atty::is(atty::Stream::Stdout);

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
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }

    let _ = builder.try_init();
}
