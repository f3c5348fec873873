//! Stateful CLI - Command-line interface for stateful context sessions
//!
//! Provides subcommands for managing states, previewing the synthesized
//! context, dispatching generated text and inspecting turn history.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use stateful::runtime::{
    FileStore, Lifecycle, SessionDriver, SharedContext, StateConfig, StateDetail, TurnRecord,
};
use stateful::{Session, SessionConfig};
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "stateful")]
#[command(about = "Persistent, keyword-driven state for AI conversations", long_about = None)]
struct Cli {
    /// Root directory for session storage
    #[arg(short, long, default_value = ".stateful")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new session directory
    Init {
        /// Milliseconds between context refreshes
        #[arg(long, default_value = "1000")]
        refresh_interval_ms: u64,

        /// Disable the turn journal
        #[arg(long)]
        no_journal: bool,

        /// Enable debug tracing for this session
        #[arg(long)]
        debug: bool,
    },

    /// List all states
    List,

    /// Show one state in detail
    Show {
        /// State name
        name: String,
    },

    /// Create a new state
    New {
        /// State name
        name: String,

        /// JSON file with a full state definition (name is overridden)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Activate a state
    Activate {
        /// State name
        name: String,
    },

    /// Deactivate a state
    Deactivate {
        /// State name
        name: String,
    },

    /// Remove a state
    Remove {
        /// State name
        name: String,
    },

    /// Restore the seed configuration
    Reset,

    /// Print the synthesized context text
    Prompt,

    /// Apply the markers in a generated message
    Dispatch {
        /// Message text, or `-` to read stdin
        text: String,
    },

    /// Show recent turns from the journal
    History {
        /// Number of recent turns to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Dispatch each stdin line as a generated message, refreshing the context
    Run,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.command {
        Commands::Init {
            refresh_interval_ms,
            no_journal,
            debug,
        } => SessionConfig {
            root: cli.root.clone(),
            refresh_interval_ms: *refresh_interval_ms,
            journal: !no_journal,
            debug: *debug,
            ..SessionConfig::default()
        },
        _ => load_or_default(&cli.root)?,
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level(&config).into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init { .. } => {
            config.init()?;
            println!("Initialized stateful session at {:?}", config.root);
        }

        Commands::List => {
            let session = Session::open(&config);
            for summary in session.list() {
                let value = summary
                    .value
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| "unset".to_string());
                let marker = if summary.active { "*" } else { " " };
                println!("{} {:>2}  {}  = {}", marker, summary.index, summary.name, value);
            }
        }

        Commands::Show { name } => {
            let detail = Session::open(&config).select_for_editing(&name)?;
            print_detail(&detail);
        }

        Commands::New { name, config: definition } => {
            let mut state = match definition {
                Some(path) => read_state_config(&path)?,
                None => StateConfig::template(name.clone()),
            };
            state.name = name.clone();
            Session::open(&config).create(state)?;
            println!("Created state: {}", name);
        }

        Commands::Activate { name } => {
            Session::open(&config).activate(&name)?;
            println!("Activated: {}", name);
        }

        Commands::Deactivate { name } => {
            Session::open(&config).deactivate(&name)?;
            println!("Deactivated: {}", name);
        }

        Commands::Remove { name } => {
            Session::open(&config).remove(&name)?;
            println!("Removed: {}", name);
        }

        Commands::Reset => {
            Session::open(&config).reset();
            println!("Restored seed configuration");
        }

        Commands::Prompt => {
            print!("{}", Session::open(&config).synthesize());
        }

        Commands::Dispatch { text } => {
            let text = if text == "-" {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read stdin")?;
                buf
            } else {
                text
            };
            let record = Session::open(&config).dispatch(&text);
            print_turn(&record);
        }

        Commands::History { limit } => {
            let session = Session::open(&config);
            let Some(journal) = session.journal() else {
                bail!("turn journal is disabled in {:?}", config.root);
            };
            let records = journal.tail(limit)?;
            println!("Showing last {} turns", records.len());
            for record in records {
                print_turn(&record);
            }
        }

        Commands::Run => {
            let session = Session::open(&config);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_loop(session, config))?;
        }
    }

    Ok(())
}

fn default_level(config: &SessionConfig) -> tracing::Level {
    if config.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    }
}

fn load_or_default(root: &Path) -> Result<SessionConfig> {
    if root.join("config.json").exists() {
        SessionConfig::load(root.to_path_buf())
    } else {
        Ok(SessionConfig {
            root: root.to_path_buf(),
            ..SessionConfig::default()
        })
    }
}

fn read_state_config(path: &Path) -> Result<StateConfig> {
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read state file: {:?}", path))?;
    serde_json::from_slice(&data).with_context(|| format!("Invalid state definition in {:?}", path))
}

async fn run_loop(session: Session<FileStore>, config: SessionConfig) -> Result<()> {
    let context = SharedContext::new();
    let slot_id = config.slot_id.clone();
    let (driver, handle) = SessionDriver::new(session, context.clone(), config);
    let task = tokio::spawn(driver.run());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(name) = line.strip_prefix(":activate ") {
            handle.apply(Lifecycle::Activate(name.trim().to_string())).await?;
            continue;
        }
        if let Some(name) = line.strip_prefix(":deactivate ") {
            handle.apply(Lifecycle::Deactivate(name.trim().to_string())).await?;
            continue;
        }
        let record = handle.dispatch(line).await?;
        print_turn(&record);
    }

    drop(handle);
    task.await.context("session driver panicked")?;
    if let Some(text) = context.text(&slot_id) {
        print!("{}", text);
    }
    Ok(())
}

fn print_detail(detail: &StateDetail) {
    println!("{}", detail.name);
    println!("  {}", detail.status_line());
    println!("  prompt:  {}", detail.prompt);
    match &detail.value {
        Some(value) => println!("  value:   {}", value),
        None => println!("  value:   unset"),
    }
    println!("  initial: {}", detail.initial);
    println!("  render:  {}", detail.render);
    println!("  actions:");
    for action in &detail.actions {
        println!("    {}: {}", action.keyword, action.prompt);
        println!("      {}", action.transition);
    }
}

fn print_turn(record: &TurnRecord) {
    println!(
        "Turn {} (#{}): {} markers, {} ignored",
        record.turn_id, record.clock.0, record.markers, record.ignored
    );
    for applied in &record.applied {
        println!(
            "  {} <- {}: {} -> {}",
            applied.state, applied.keyword, applied.before, applied.after
        );
    }
    for failure in &record.failures {
        println!("  {} <- {}: rejected ({})", failure.state, failure.keyword, failure.error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_debug_flag_raises_tracing_level() {
        let cli = Cli::try_parse_from(["stateful", "init", "--debug", "--no-journal"]).unwrap();
        let Commands::Init { debug, no_journal, .. } = cli.command else {
            panic!("expected init");
        };
        assert!(debug && no_journal);

        let config = SessionConfig {
            debug,
            ..SessionConfig::default()
        };
        assert_eq!(default_level(&config), tracing::Level::DEBUG);
        assert_eq!(default_level(&SessionConfig::default()), tracing::Level::INFO);
    }

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = load_or_default(temp.path()).unwrap();
        assert_eq!(config.root, temp.path());
        assert!(!config.debug);
    }
}
