//! Action-governor CLI.
//!
//! Manages the persistent state under `.governor/` (config + SQLite store)
//! that the governor library consults before every automated action. The
//! session wiring that drives actions against a live browser lives with the
//! embedding application; this binary inspects and bootstraps state.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use governor::config::{GovernorConfig, load_config, write_config};
use governor::core::types::ActionKind;
use governor::exit_codes;
use governor::io::store::Store;

const CONFIG_PATH: &str = ".governor/config.toml";
const DB_PATH: &str = ".governor/governor.db";

#[derive(Parser)]
#[command(
    name = "governor",
    version,
    about = "Quota, restriction, and ledger state for automated social-graph actions"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.governor/config.toml` and the state database if missing.
    Init {
        /// Overwrite an existing config file.
        #[arg(short, long)]
        force: bool,
    },
    /// Print current-window quota usage per action kind.
    Quotas,
    /// Check whether a target is still eligible under the per-target limit.
    Eligibility { username: String },
}

fn main() {
    governor::logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(force),
        Command::Quotas => cmd_quotas(),
        Command::Eligibility { username } => cmd_eligibility(&username),
    }
}

fn cmd_init(force: bool) -> Result<i32> {
    let config_path = Path::new(CONFIG_PATH);
    let state_dir = config_path.parent().context("config path missing parent")?;
    fs::create_dir_all(state_dir)
        .with_context(|| format!("create directory {}", state_dir.display()))?;

    if force || !config_path.exists() {
        write_config(config_path, &GovernorConfig::default())?;
    }
    // Opening applies the schema.
    Store::open(DB_PATH).context("initialize state database")?;
    println!("initialized {} and {}", CONFIG_PATH, DB_PATH);
    Ok(exit_codes::OK)
}

fn cmd_quotas() -> Result<i32> {
    let cfg = load_config(Path::new(CONFIG_PATH))?;
    let store = Store::open(DB_PATH).context("open state database")?;
    let now = chrono::Utc::now();

    for kind in [ActionKind::Friend, ActionKind::Unfollow, ActionKind::Comment] {
        match cfg.quota.for_kind(kind) {
            Some(limit) => {
                let used = store
                    .quota_usage(&cfg.profile_id, kind, limit.window_secs, now)
                    .context("read quota usage")?;
                println!(
                    "{}: {}/{} (window {}s)",
                    kind.as_str(),
                    used,
                    limit.limit,
                    limit.window_secs
                );
            }
            None => println!("{}: unlimited", kind.as_str()),
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_eligibility(username: &str) -> Result<i32> {
    let cfg = load_config(Path::new(CONFIG_PATH))?;
    let store = Store::open(DB_PATH).context("open state database")?;
    let times = store
        .times_acted(&cfg.profile_id, username)
        .context("read restriction record")?;

    if times < cfg.friend_times {
        println!(
            "{}: acted {} of {} times, eligible",
            username, times, cfg.friend_times
        );
        Ok(exit_codes::OK)
    } else {
        println!(
            "{}: acted {} of {} times, not eligible",
            username, times, cfg.friend_times
        );
        Ok(exit_codes::INELIGIBLE)
    }
}
