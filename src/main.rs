//! Binary entrypoint for the Discobot CLI.
//!
//! Commands:
//! - `run` - start the bot on the console transport
//! - `init` - write a starter `config.toml`
//! - `check` - validate configuration and environment, then print a summary
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};
use std::sync::Arc;

use discobot::bot::Bot;
use discobot::config::{Config, Credentials, ProcessEnviron};
use discobot::transport::ConsoleTransport;

#[derive(Parser)]
#[command(name = "discobot")]
#[command(about = "A modular chat bot with layered command permissions")]
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
    /// Start the bot, reading messages from stdin
    Run,
    /// Write a default configuration file
    Init,
    /// Validate configuration and required environment keys
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            init_logging(&None, cli.verbose);
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
        }
        Commands::Check => {
            let config = load_config(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            let environ = ProcessEnviron;
            let mut ok = true;
            if let Err(e) = config.validate() {
                error!("{}", e);
                ok = false;
            }
            match Credentials::from_environ(&environ) {
                Ok(creds) => println!("credentials: {}", creds.email),
                Err(e) => {
                    error!("{}", e);
                    ok = false;
                }
            }
            println!("prefix: {}", config.bot.prefix);
            println!("fault policy: {:?}", config.bot.fault_policy);
            println!("superusers: {}", config.bot.superusers.join(";"));
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Run => {
            let config = load_config(&cli.config).await?;
            init_logging(&Some(config.clone()), cli.verbose);
            info!("Starting Discobot v{}", env!("CARGO_PKG_VERSION"));
            let transport = Arc::new(ConsoleTransport::new(&config.bot.name));
            let mut bot = Bot::with_default_modules(config, Arc::new(ProcessEnviron), transport)?;
            bot.run().await?;
        }
    }

    Ok(())
}

/// Load the config file if present (defaults otherwise), then overlay the environment.
async fn load_config(path: &str) -> Result<Config> {
    let mut config = if tokio::fs::try_exists(path).await.unwrap_or(false) {
        Config::load(path).await?
    } else {
        Config::default()
    };
    config.apply_environ(&ProcessEnviron);
    Ok(config)
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // Base level from CLI verbosity; config level applies when no -v was given
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Mirror to the console only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}: {}", ts, record.level(), record.target(), record.args());
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
            writeln!(fmt, "{} [{}] {}: {}", ts, record.level(), record.target(), record.args())
        });
    }
    let _ = builder.try_init();
}
