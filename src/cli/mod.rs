use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ConfigLoader;

pub mod commands;

use self::commands::{CalendarArgs, CommandContext, EntryRefArgs, LoginArgs, PostArgs};

#[derive(Parser, Debug)]
#[command(
    name = "anonikki",
    version,
    about = "Post and browse anonymous diary entries with a freeform image canvas"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the config file location (takes precedence over ANONIKKI_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over ANONIKKI_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Store a session token for later commands
    Login(LoginArgs),
    /// Forget the stored session token
    Logout,
    /// List shared entries, newest first
    List,
    /// Print one entry with its image layout
    Show(EntryRefArgs),
    /// Compose and share a new entry
    Post(PostArgs),
    /// Delete one of your entries
    Delete(EntryRefArgs),
    /// Show a month of entries as a calendar
    Calendar(CalendarArgs),
    /// List the font families and preset sizes available for entries
    Fonts,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("ANONIKKI_CONFIG", path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var("ANONIKKI_DATA", path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let ctx = CommandContext::new(config, loader.paths().clone());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    runtime.block_on(async move {
        match cli.command {
            Commands::Login(args) => commands::login(&ctx, args),
            Commands::Logout => commands::logout(&ctx),
            Commands::List => commands::list_entries(&ctx).await,
            Commands::Show(args) => commands::show_entry(&ctx, args).await,
            Commands::Post(args) => commands::post_entry(&ctx, args).await,
            Commands::Delete(args) => commands::delete_entry(&ctx, args).await,
            Commands::Calendar(args) => commands::show_calendar(&ctx, args).await,
            Commands::Fonts => commands::list_fonts(),
        }
    })
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn post_accepts_repeated_images() {
        let cli = Cli::try_parse_from([
            "anonikki",
            "--log-level",
            "debug",
            "post",
            "--title",
            "Rain",
            "--image",
            "a.png@10,20",
            "--image",
            "b.jpg@0,0,200x100",
            "--bold",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        let Commands::Post(args) = cli.command else {
            panic!("expected post command");
        };
        assert_eq!(args.images.len(), 2);
        assert!(args.bold);
        assert!(!args.italic);
    }

    #[test]
    fn calendar_accepts_negative_shift() {
        let cli = Cli::try_parse_from(["anonikki", "calendar", "--shift", "-2"]).unwrap();
        let Commands::Calendar(args) = cli.command else {
            panic!("expected calendar command");
        };
        assert_eq!(args.shift, -2);
    }
}
