//! passgate - Interactive confirmation and clipboard guard front end.
//!
//! # Usage
//!
//! ```bash
//! # Enter a secret twice, copy it and clear it again after the timeout
//! passgate copy web/example.com
//!
//! # Review who a secret would be encrypted for
//! passgate confirm web/example.com alice@example.com bob@example.com
//!
//! # Pick one of the usable private keys and print its fingerprint
//! passgate select-key
//! ```
//!
//! The hidden `unclip` subcommand is the clipboard watcher. It is started
//! by `copy` in its own process group and is not meant to be run by hand.

mod gpg;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use secrecy::ExposeSecret;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use passgate_core::{
    clear_clipboard, Clipboard, ClipboardGuard, Config, Confirmation, Console, SystemClipboard,
    UnclipOutcome,
};

use crate::gpg::GpgKeyRing;

/// Interactive confirmation and self-clearing clipboard helper.
#[derive(Parser)]
#[command(name = "passgate")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file [default: ~/.config/passgate/config.toml]
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Do not ask before encrypting for a set of recipients
    #[arg(long)]
    no_confirm: bool,

    /// Seconds until a copied secret is cleared from the clipboard
    #[arg(short, long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only show errors
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a secret twice and copy it to the clipboard for a limited time
    ///
    /// On X11 the copied text is served by passgate itself. Without a
    /// clipboard manager running it disappears when passgate exits, and the
    /// watcher then leaves the clipboard alone because its content changed.
    Copy {
        /// Name of the secret, shown in the prompt
        name: String,
    },

    /// Show the recipients of a secret and ask whether to continue
    Confirm {
        /// Name of the secret
        name: String,

        /// Key IDs, fingerprints or email addresses
        #[arg(required = true)]
        recipients: Vec<String>,
    },

    /// Choose one of the usable private keys and print its fingerprint
    SelectKey {
        /// Text shown above the key list
        #[arg(long, default_value = "Please select a private key")]
        prompt: String,
    },

    /// Ask whether a public key should be imported (exit status 0 means yes)
    ImportKey {
        /// Key ID or fingerprint to show
        key: String,
    },

    /// Ask a yes/no question until answered (exit status 0 means yes)
    Ask {
        /// The question
        question: String,
    },

    /// Clear the clipboard after a timeout if it still holds the copied secret
    #[command(hide = true)]
    Unclip {
        /// Seconds to wait before checking the clipboard
        #[arg(long)]
        timeout: u64,
    },
}

fn setup_logging(level: &str, detached: bool) {
    // RUST_LOG wins over the flags
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // The watcher has no terminal; its stderr goes to /dev/null
    if detached {
        if let Ok(journald_layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(journald_layer)
                .with(filter)
                .init();
            return;
        }
    }

    // stdout carries the prompts, so logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Load the config file and apply command line overrides.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            debug!(path = %path.display(), "Loading configuration from specified path");
            Config::load_from(path).context("Failed to load configuration")?
        }
        None => Config::load().context("Failed to load configuration")?,
    };

    if cli.no_confirm {
        config.confirm.no_confirm = true;
    }
    if let Some(timeout) = cli.timeout {
        config.clipboard.timeout = timeout;
    }
    Ok(config)
}

/// Handle the unclip command.
async fn cmd_unclip(timeout: u64) -> Result<ExitCode> {
    let guard = ClipboardGuard::from_env(Duration::from_secs(timeout))?;
    let mut clipboard = SystemClipboard::new()?;

    match guard.watch(&mut clipboard).await? {
        UnclipOutcome::Cleared => info!("Clipboard cleared"),
        UnclipOutcome::Changed => info!("Clipboard content changed, left untouched"),
    }
    Ok(ExitCode::SUCCESS)
}

/// Handle the copy command.
async fn cmd_copy(config: &Config, name: &str) -> Result<ExitCode> {
    let mut confirmation = Confirmation::new(Console::stdio(), &config.confirm);
    let secret = confirmation
        .ask_for_password(name)
        .await
        .context("Failed to read password")?;

    let mut clipboard = SystemClipboard::new()?;
    clipboard
        .set_contents(secret.expose_secret())
        .context("Failed to copy to clipboard")?;
    clear_clipboard(secret.expose_secret().as_bytes(), config.clipboard.timeout)
        .context("Failed to start clipboard watcher")?;

    println!(
        "Copied {} to clipboard. Will clear in {} seconds.",
        name, config.clipboard.timeout
    );
    Ok(ExitCode::SUCCESS)
}

/// Handle the confirm command.
fn cmd_confirm(config: &Config, name: &str, recipients: Vec<String>) -> Result<ExitCode> {
    let keyring = GpgKeyRing::new(config.gpg.binary.clone());
    let mut confirmation = Confirmation::new(Console::stdio(), &config.confirm);

    match confirmation.confirm_recipients(&keyring, name, recipients) {
        Ok(recipients) => {
            for recipient in recipients {
                println!("{}", recipient);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_aborted() => {
            eprintln!("Error: {}", e);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

/// Handle the select-key command.
fn cmd_select_key(config: &Config, prompt: &str) -> Result<ExitCode> {
    let keyring = GpgKeyRing::new(config.gpg.binary.clone());
    let mut confirmation = Confirmation::new(Console::stdio(), &config.confirm);

    let fingerprint = confirmation
        .ask_for_private_key(&keyring, prompt)
        .context("Failed to select a private key")?;
    println!("{}", fingerprint);
    Ok(ExitCode::SUCCESS)
}

/// Handle the import-key command.
fn cmd_import_key(config: &Config, key: &str) -> Result<ExitCode> {
    let mut confirmation = Confirmation::new(Console::stdio(), &config.confirm);
    Ok(exit_code(confirmation.ask_for_key_import(key)))
}

/// Handle the ask command.
fn cmd_ask(config: &Config, question: &str) -> Result<ExitCode> {
    let mut confirmation = Confirmation::new(Console::stdio(), &config.confirm);
    let answer = confirmation
        .ask_for_confirmation(question)
        .context("Failed to read answer")?;
    Ok(exit_code(answer))
}

fn exit_code(yes: bool) -> ExitCode {
    if yes {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    // The watcher only needs its own arguments and environment
    if let Commands::Unclip { timeout } = cli.command {
        return cmd_unclip(timeout).await;
    }

    let config = load_config(&cli)?;
    match cli.command {
        Commands::Copy { name } => cmd_copy(&config, &name).await,
        Commands::Confirm { name, recipients } => cmd_confirm(&config, &name, recipients),
        Commands::SelectKey { prompt } => cmd_select_key(&config, &prompt),
        Commands::ImportKey { key } => cmd_import_key(&config, &key),
        Commands::Ask { question } => cmd_ask(&config, &question),
        Commands::Unclip { timeout } => cmd_unclip(timeout).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };
    setup_logging(log_level, matches!(cli.command, Commands::Unclip { .. }));

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
