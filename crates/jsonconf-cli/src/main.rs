//! jsonconf: read and edit a JSON config file by dotted path.
//!
//! # Usage
//!
//! ```text
//! jsonconf [OPTIONS] <FILE> <COMMAND>
//!
//! Commands:
//!   get [PATH]          Print the value at PATH (whole document if omitted)
//!   set <PATH> <VALUE>  Store VALUE at PATH
//!   delete <PATH>       Remove the value at PATH
//!   append <PATH> <VALUE>
//!                       Push VALUE onto the sequence at PATH
//!   init                Create FILE from the defaults if it does not exist
//!
//! Options:
//!   --compact               Write compact JSON instead of two-space indentation
//!   --no-atomic             Write in place instead of temp file + rename
//!   --strict                Fail instead of overwriting scalars on the way
//!   --create                Create FILE from the defaults when missing
//!   --allow-comments        Accept // and /* */ comments when reading
//!   --defaults <JSON>       Object laid underneath the file contents
//!   --options <TOML FILE>   Store options file; flags override it
//! ```
//!
//! VALUE is parsed as JSON; anything that is not valid JSON is stored as a
//! string, so `jsonconf app.json set name alice` stores `"alice"` while
//! `jsonconf app.json set port 8080` stores the number `8080`.
//!
//! `get` prints the value as pretty JSON on stdout and exits with status 1
//! when nothing is stored at PATH.
//!
//! # Environment variable overrides
//!
//! | Variable                  | Flag               |
//! |---------------------------|--------------------|
//! | `JSONCONF_COMPACT`        | `--compact`        |
//! | `JSONCONF_NO_ATOMIC`      | `--no-atomic`      |
//! | `JSONCONF_STRICT`         | `--strict`         |
//! | `JSONCONF_CREATE`         | `--create`         |
//! | `JSONCONF_ALLOW_COMMENTS` | `--allow-comments` |
//! | `JSONCONF_DEFAULTS`       | `--defaults`       |
//! | `JSONCONF_OPTIONS`        | `--options`        |
//!
//! Log output goes to stderr and is controlled by `RUST_LOG` (default `warn`).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use jsonconf_core::{ConfigStore, StoreOptions};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Read and edit a JSON config file by dotted path.
#[derive(Debug, Parser)]
#[command(name = "jsonconf", about = "Read and edit a JSON config file by dotted path", version)]
struct Cli {
    /// The JSON config file.
    file: PathBuf,

    /// Write compact JSON instead of two-space indentation.
    #[arg(long, global = true, env = "JSONCONF_COMPACT")]
    compact: bool,

    /// Write in place instead of through a temp file and rename.
    #[arg(long, global = true, env = "JSONCONF_NO_ATOMIC")]
    no_atomic: bool,

    /// Fail instead of overwriting scalars that are in the way of a write.
    #[arg(long, global = true, env = "JSONCONF_STRICT")]
    strict: bool,

    /// Create the file from the defaults when it does not exist.
    #[arg(long, global = true, env = "JSONCONF_CREATE")]
    create: bool,

    /// Accept `//` and `/* */` comments when reading.
    #[arg(long, global = true, env = "JSONCONF_ALLOW_COMMENTS")]
    allow_comments: bool,

    /// JSON object laid underneath the file contents.
    #[arg(long, global = true, value_name = "JSON", env = "JSONCONF_DEFAULTS")]
    defaults: Option<String>,

    /// TOML file with store options.  Flags take precedence over it.
    #[arg(long, global = true, value_name = "TOML FILE", env = "JSONCONF_OPTIONS")]
    options: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the value at PATH, or the whole document when PATH is omitted.
    Get { path: Option<String> },
    /// Store VALUE at PATH, creating missing parents.
    Set { path: String, value: String },
    /// Remove the value at PATH.
    Delete { path: String },
    /// Push VALUE onto the existing sequence at PATH.
    Append { path: String, value: String },
    /// Create the file from the defaults if it does not exist yet.
    Init,
}

impl Cli {
    /// Builds the store options: the `--options` file first, then flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the options file cannot be read or parsed.
    async fn store_options(&self) -> anyhow::Result<StoreOptions> {
        let mut options = match &self.options {
            Some(path) => {
                let text = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("failed to read options file {}", path.display()))?;
                StoreOptions::from_toml_str(&text)
                    .with_context(|| format!("invalid options file {}", path.display()))?
            }
            None => StoreOptions::default(),
        };

        if self.compact {
            options.pretty_print = false;
        }
        if self.no_atomic {
            options.atomic_writes = false;
        }
        if self.strict {
            options.strict_access = true;
        }
        if self.create || matches!(self.command, Command::Init) {
            options.create_if_non_existent = true;
        }
        if self.allow_comments {
            options.allow_comments = true;
        }
        Ok(options)
    }

    /// Parses `--defaults`, or returns an empty object.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON.
    fn defaults(&self) -> anyhow::Result<Value> {
        match &self.defaults {
            Some(text) => serde_json::from_str(text).context("--defaults is not valid JSON"),
            None => Ok(Value::Object(Default::default())),
        }
    }
}

/// Parses a command-line VALUE: JSON when it parses, a JSON string otherwise.
fn parse_value(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_owned()))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    if run(cli).await? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

/// Executes one command.  Returns `false` when `get` found nothing.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let options = cli.store_options().await?;
    let defaults = cli.defaults()?;
    debug!(file = %cli.file.display(), ?options, "opening store");

    let store = ConfigStore::builder(&cli.file)
        .defaults(defaults)
        .options(options)
        .open()
        .await
        .with_context(|| format!("failed to open {}", cli.file.display()))?;

    let mut found = true;
    match cli.command {
        Command::Get { path } => {
            let path = path.unwrap_or_default();
            match store.get(path.as_str()).await? {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => found = false,
            }
        }
        Command::Set { path, value } => {
            store
                .set(path.as_str(), parse_value(&value))
                .await
                .with_context(|| format!("failed to set '{path}'"))?;
        }
        Command::Delete { path } => {
            store
                .delete(path.as_str())
                .await
                .with_context(|| format!("failed to delete '{path}'"))?;
        }
        Command::Append { path, value } => {
            store
                .append(path.as_str(), parse_value(&value))
                .await
                .with_context(|| format!("failed to append to '{path}'"))?;
        }
        Command::Init => println!("{}", store.file_path().display()),
    }

    store.close().await?;
    Ok(found)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
