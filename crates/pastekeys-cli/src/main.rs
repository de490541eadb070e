use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use uuid::Uuid;

use pastekeys::{
    Activation, Chord, EnigoKeystroke, JsonFile, PasteActivator, PasteKeystroke, PasteQueue,
    Runner, RunnerConfig, SnippetStore, SystemClipboard,
};

mod config;

use config::Settings;

/// Extra time the process stays up after a one-shot paste.
const PASTE_LINGER_MS: u64 = 250;

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Parser, Debug)]
#[command(name = "pastekeys")]
#[command(about = "Paste stored text snippets with global hotkeys", long_about = None)]
struct Args {
    /// Path to the RON settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Snippet file, overriding the settings
    #[arg(short, long, global = true)]
    data_file: Option<PathBuf>,

    /// Set the log level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Run the hotkey daemon (the default)
    Run {
        /// Ignore stdin instead of reading edit commands from it
        #[arg(long)]
        no_stdin: bool,
    },
    /// Show every snippet and its hotkey
    List,
    /// Add a snippet at the next free shortcut index
    Add {
        /// Text for the new snippet
        text: Option<String>,
    },
    /// Delete a snippet
    Delete { id: Uuid },
    /// Replace a snippet's text
    Set { id: Uuid, text: String },
    /// Move a snippet to another shortcut index
    Reassign { id: Uuid, index: u32 },
    /// Paste the snippet at a shortcut index into the focused window
    Paste { index: u32 },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Only initialize tracing if RUST_LOG is set or log level is explicitly provided
    if std::env::var("RUST_LOG").is_ok() || args.log_level.is_some() {
        let log_level = match args.log_level.clone().unwrap_or(LogLevel::Info) {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };

        // Logs go to stderr; stdout carries command responses
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .without_time()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .with(
                EnvFilter::from_default_env()
                    .add_directive(format!("pastekeys={log_level}").parse()?)
                    .add_directive(format!("pastekeys_cli={log_level}").parse()?),
            )
            .init();
    }

    let settings = load_settings(&args)?;
    let file = match &args.data_file {
        Some(path) => JsonFile::new(path),
        None => settings.snippet_file()?,
    };
    debug!("Snippet file: {:?}", file.path());
    let mut store = SnippetStore::open(file);

    match args.command.unwrap_or(Cmd::Run { no_stdin: false }) {
        Cmd::Run { no_stdin } => {
            let config = RunnerConfig::default()
                .with_modifiers(settings.modifiers()?)
                .with_paste_delay(settings.paste_delay())
                .with_stdin(!no_stdin);
            info!("Starting pastekeys daemon");
            Runner::new(config, store).run()?;
        }
        Cmd::List => list(&store, &settings)?,
        Cmd::Add { text } => {
            let id = store.add()?;
            check_saved(&store)?;
            if let Some(text) = text {
                store.update_text(id, text);
                store.save().context("Failed to save snippets")?;
            }
            println!("{id}");
        }
        Cmd::Delete { id } => {
            if !store.delete(id) {
                bail!("No snippet {id}");
            }
            check_saved(&store)?;
        }
        Cmd::Set { id, text } => {
            if !store.update_text(id, text) {
                bail!("No snippet {id}");
            }
            store.save().context("Failed to save snippets")?;
        }
        Cmd::Reassign { id, index } => {
            if !store.reassign(id, index)? {
                bail!("No snippet {id}");
            }
            check_saved(&store)?;
        }
        Cmd::Paste { index } => paste(&store, &settings, index)?,
    }
    Ok(())
}

fn load_settings(args: &Args) -> Result<Settings> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => match Settings::default_path() {
            Some(path) => path,
            None => return Ok(Settings::default()),
        },
    };
    debug!("Loading settings from {:?}", path);
    Settings::load(&path)
}

fn check_saved(store: &SnippetStore) -> Result<()> {
    match store.last_error() {
        Some(e) => bail!("Failed to save snippets to {}: {e}", store.location()),
        None => Ok(()),
    }
}

fn list(store: &SnippetStore, settings: &Settings) -> Result<()> {
    let modifiers = settings.modifiers()?;
    // Palette slots go to indices 1..=min(len, 9), whatever indices exist.
    let bound = store.len().min(pastekeys::key::PALETTE.len());
    for snippet in store.snippets() {
        let chord = (snippet.shortcut_index as usize)
            .checked_sub(1)
            .filter(|slot| *slot < bound)
            .and_then(|slot| Chord::for_slot(modifiers, slot))
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>3}  {:<12} {}  {}",
            snippet.shortcut_index,
            chord,
            snippet.id,
            snippet.text.replace('\n', "\\n")
        );
    }
    Ok(())
}

fn paste(store: &SnippetStore, settings: &Settings, index: u32) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
    // The queue only keeps time; the keystroke goes out from this thread.
    let (due_tx, due_rx) = mpsc::channel();
    let queue = PasteQueue::spawn(runtime.handle(), move || {
        let _ = due_tx.send(());
    });
    let mut activator =
        PasteActivator::new(SystemClipboard::new(), queue).with_delay(settings.paste_delay());
    match activator.activate(store, index) {
        Activation::Scheduled { .. } => {
            due_rx
                .recv_timeout(activator.delay() + Duration::from_secs(1))
                .context("Paste never came due")?;
            EnigoKeystroke.paste()?;
            // Keep the clipboard owner alive while the target reads it.
            thread::sleep(Duration::from_millis(PASTE_LINGER_MS));
            Ok(())
        }
        Activation::NoSnippet => bail!("No snippet at shortcut {index}"),
        Activation::ClipboardFailed(e) => bail!("Clipboard write failed: {e}"),
        Activation::QueueClosed { .. } => bail!("Paste queue closed"),
    }
}
