use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kenning_core::{CodeOwnerResult, DiffHistory, KenningConfig, OutputFormat};
use kenning_history::mining::{mine_file_history, MiningOptions};
use kenning_knowledge::weight::weigher_for;
use kenning_knowledge::{CodeOwnerFinder, KnowledgeState};

#[derive(Parser)]
#[command(
    name = "kenning",
    version,
    about = "Find who still knows a file",
    long_about = "Kenning estimates how well each contributor still understands a file.\n\n\
                   It replays the file's git history line by line, crediting developers for the\n\
                   lines they wrote and the code they read around their edits, and lets that\n\
                   knowledge fade over time.\n\n\
                   Examples:\n  \
                     kenning owner src/lib.rs                 Rank who knows src/lib.rs best\n  \
                     kenning owner src/lib.rs --top 10        Show the top 10 developers\n  \
                     kenning knowledge src/lib.rs -d alice@x  Per-line knowledge of one developer\n  \
                     kenning export src/lib.rs > hist.json    Save the mined history as JSON\n  \
                     kenning init                             Create a .kenning.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .kenning.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable tables and summaries (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  GitHub-flavored Markdown"
    )]
    format: OutputFormat,

    /// Evaluate knowledge as of this instant instead of now (RFC 3339)
    #[arg(long, global = true)]
    now: Option<DateTime<Utc>>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

/// Where the revision history of a file comes from.
#[derive(clap::Args)]
struct HistorySource {
    /// Repository path (default: current directory)
    #[arg(long, default_value = ".")]
    repo: PathBuf,

    /// Branch to walk (default: HEAD)
    #[arg(long)]
    branch: Option<String>,

    /// Read a previously exported history instead of mining git
    #[arg(long, value_name = "PATH")]
    history_json: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Rank developers by how well they know a file
    #[command(long_about = "Rank developers by how well they know a file.\n\n\
        Replays every revision of the file and reports each author's knowledge level,\n\
        a weighted average over the file's current lines in [0, 100%].\n\n\
        Examples:\n  kenning owner src/main.rs\n  kenning owner src/main.rs --half-life 180 --top 3\n  \
        kenning owner src/main.rs --history-json history.json")]
    Owner {
        /// File to analyze, relative to the repository root
        file: PathBuf,

        #[command(flatten)]
        source: HistorySource,

        /// Number of developers to show (default: from config, 5)
        #[arg(long)]
        top: Option<usize>,

        /// Knowledge half-life in days (default: from config, 500)
        #[arg(long)]
        half_life: Option<f64>,
    },
    /// Show one developer's knowledge of every line of a file
    #[command(long_about = "Show one developer's knowledge of every line of a file.\n\n\
        Examples:\n  kenning knowledge src/main.rs --developer alice@example.com")]
    Knowledge {
        /// File to analyze, relative to the repository root
        file: PathBuf,

        /// Developer identity (commit author email)
        #[arg(long, short)]
        developer: String,

        #[command(flatten)]
        source: HistorySource,
    },
    /// Mine a file's history and print it as JSON
    #[command(long_about = "Mine a file's history and print it as JSON.\n\n\
        The output can be fed back with --history-json.\n\n\
        Example:\n  kenning export src/main.rs > history.json")]
    Export {
        /// File to mine, relative to the repository root
        file: PathBuf,

        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Branch to walk (default: HEAD)
        #[arg(long)]
        branch: Option<String>,
    },
    /// Create a default .kenning.toml configuration file
    #[command(long_about = "Create a default .kenning.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .kenning.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// A loaded history plus the current text of the file when known.
struct Loaded {
    path: String,
    history: DiffHistory,
    lines: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OwnerEntry<'a> {
    rank: usize,
    developer: &'a str,
    knowledge_level: f64,
    percent: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OwnerReport<'a> {
    path: &'a str,
    as_of: DateTime<Utc>,
    revisions: usize,
    authors: usize,
    owners: Vec<OwnerEntry<'a>>,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1mkenning\x1b[0m v{version}: who still knows this file?\n");

        println!("Quick start:");
        println!("  \x1b[36mkenning owner <FILE>\x1b[0m          Rank developers by knowledge");
        println!("  \x1b[36mkenning init\x1b[0m                  Create a .kenning.toml config file\n");

        println!("All commands:");
        println!("  \x1b[32mowner\x1b[0m      Rank developers by how well they know a file");
        println!("  \x1b[32mknowledge\x1b[0m  Per-line knowledge of one developer");
        println!("  \x1b[32mexport\x1b[0m     Print a file's mined history as JSON");
        println!("  \x1b[32minit\x1b[0m       Create default configuration\n");
    } else {
        println!("kenning v{version}: who still knows this file?\n");

        println!("Quick start:");
        println!("  kenning owner <FILE>          Rank developers by knowledge");
        println!("  kenning init                  Create a .kenning.toml config file\n");

        println!("All commands:");
        println!("  owner      Rank developers by how well they know a file");
        println!("  knowledge  Per-line knowledge of one developer");
        println!("  export     Print a file's mined history as JSON");
        println!("  init       Create default configuration\n");
    }

    println!("Run 'kenning <command> --help' for details.");
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn spinner(message: &str) -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Some(pb)
}

fn mine(
    config: &KenningConfig,
    repo: &Path,
    file: &Path,
    branch: Option<String>,
) -> Result<Loaded> {
    let mut options = MiningOptions::from(&config.history);
    if branch.is_some() {
        options.branch = branch;
    }
    let weigher = weigher_for(config.knowledge.weight);

    let pb = spinner(&format!("Mining history of {}...", file.display()));
    let mined = mine_file_history(repo, file, &options, weigher.as_ref()).inspect_err(|_e| {
        if let Some(pb) = &pb {
            pb.finish_with_message("Failed");
        }
    })?;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    Ok(Loaded {
        path: mined.path,
        history: mined.history,
        lines: Some(mined.lines),
    })
}

fn load(config: &KenningConfig, file: &Path, source: HistorySource) -> Result<Loaded> {
    match source.history_json {
        Some(ref json_path) => {
            let content = std::fs::read_to_string(json_path)
                .into_diagnostic()
                .wrap_err(format!("reading {}", json_path.display()))?;
            let history: DiffHistory = serde_json::from_str(&content)
                .into_diagnostic()
                .wrap_err(format!("parsing {}", json_path.display()))?;
            Ok(Loaded {
                path: file.display().to_string(),
                history,
                lines: None,
            })
        }
        None => mine(config, &source.repo, file, source.branch),
    }
}

/// The instant to decay knowledge to. The system clock never goes below the
/// newest revision, so commits dated slightly in the future still work.
fn resolve_now(explicit: Option<DateTime<Utc>>, history: &DiffHistory) -> DateTime<Utc> {
    match explicit {
        Some(now) => now,
        None => {
            let now = Utc::now();
            history
                .last()
                .map_or(now, |rev| now.max(rev.timestamp()))
        }
    }
}

fn percent(level: f64) -> u32 {
    (level * 100.0).round() as u32
}

fn print_owners(
    loaded: &Loaded,
    result: &CodeOwnerResult,
    now: DateTime<Utc>,
    top: usize,
    format: OutputFormat,
) -> Result<()> {
    let ranked: Vec<(&str, f64)> = result.ranked().into_iter().take(top).collect();

    match format {
        OutputFormat::Json => {
            let report = OwnerReport {
                path: &loaded.path,
                as_of: now,
                revisions: loaded.history.len(),
                authors: result.len(),
                owners: ranked
                    .iter()
                    .enumerate()
                    .map(|(i, (developer, level))| OwnerEntry {
                        rank: i + 1,
                        developer,
                        knowledge_level: *level,
                        percent: percent(*level),
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&report).into_diagnostic()?);
        }
        OutputFormat::Markdown => {
            println!("# Code owners of `{}`\n", loaded.path);
            println!(
                "**Revisions:** {}  **Authors:** {}  **As of:** {}\n",
                loaded.history.len(),
                result.len(),
                now.format("%Y-%m-%d")
            );
            if ranked.is_empty() {
                println!("No authors found.");
            } else {
                println!("| Rank | Developer | Knowledge |");
                println!("|------|-----------|-----------|");
                for (i, (developer, level)) in ranked.iter().enumerate() {
                    println!("| {} | {} | {}% |", i + 1, developer, percent(*level));
                }
            }
        }
        OutputFormat::Text => {
            println!(
                "Code owners of {} ({} revisions, {} authors, as of {}):",
                loaded.path,
                loaded.history.len(),
                result.len(),
                now.format("%Y-%m-%d")
            );
            println!("{:-<72}", "");
            if ranked.is_empty() {
                println!("No authors found.");
            }
            for (i, (developer, level)) in ranked.iter().enumerate() {
                println!("{:>2}. {:<60} {:>3}%", i + 1, developer, percent(*level));
            }
        }
    }
    Ok(())
}

fn print_knowledge(
    loaded: &Loaded,
    state: &KnowledgeState,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(state).into_diagnostic()?);
        }
        OutputFormat::Markdown | OutputFormat::Text => {
            let markdown = format == OutputFormat::Markdown;
            if markdown {
                println!("# Knowledge of `{}` in `{}`\n", state.developer(), loaded.path);
                println!("```");
            } else {
                println!("Knowledge of {} in {}:", state.developer(), loaded.path);
            }
            for (i, line) in state.lines().iter().enumerate() {
                let text = loaded
                    .lines
                    .as_ref()
                    .and_then(|lines| lines.get(i))
                    .map(String::as_str)
                    .unwrap_or("");
                println!("{:>5} {:>4}% | {}", i + 1, percent(line.knowledge), text);
            }
            if markdown {
                println!("```");
            }
            println!(
                "\nOverall: {}%",
                percent(state.total_knowledge_level())
            );
        }
    }
    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Kenning Configuration

[knowledge]
# Forgetting model: "exponential" or "never"
# oblivion = "exponential"
# half_life_days = 500
# Line weight: "words" or "length"
# weight = "words"
# How far reading knowledge spreads around an edit
# spread_coefficient = 6.0
# Writing credit for lines somebody else inserted (0 to 1)
# foreign_writing_knowledge = 0.0

[history]
# branch = "main"
# max_revisions = 0

[output]
# top = 5
"#;

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => KenningConfig::from_file(path)?,
        None => {
            let default_path = Path::new(".kenning.toml");
            if default_path.exists() {
                KenningConfig::from_file(default_path)?
            } else {
                KenningConfig::default()
            }
        }
    };

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    tracing::debug!(format = %cli.format, config = ?config, "starting");

    match cli.command {
        None => {
            print_welcome(use_color);
        }
        Some(Command::Owner {
            ref file,
            source,
            top,
            half_life,
        }) => {
            if let Some(days) = half_life {
                config.knowledge.half_life_days = days;
            }
            config.validate()?;
            let top = top.unwrap_or(config.output.top);

            let loaded = load(&config, file, source)?;
            let now = resolve_now(cli.now, &loaded.history);
            let finder = CodeOwnerFinder::from_config(&config.knowledge)?;
            let result = finder.find(&loaded.history, now)?;

            print_owners(&loaded, &result, now, top, cli.format)?;
        }
        Some(Command::Knowledge {
            ref file,
            ref developer,
            source,
        }) => {
            let loaded = load(&config, file, source)?;
            if !loaded.history.authors().iter().any(|a| a == developer) {
                eprintln!(
                    "note: {developer} never edited {}; knowledge comes from nothing",
                    loaded.path
                );
            }
            let now = resolve_now(cli.now, &loaded.history);
            let finder = CodeOwnerFinder::from_config(&config.knowledge)?;
            let state = finder.knowledge_of(developer, &loaded.history, now)?;

            print_knowledge(&loaded, &state, cli.format)?;
        }
        Some(Command::Export {
            ref file,
            ref repo,
            ref branch,
        }) => {
            let loaded = mine(&config, repo, file, branch.clone())?;
            println!(
                "{}",
                serde_json::to_string_pretty(&loaded.history).into_diagnostic()?
            );
        }
        Some(Command::Init) => {
            let path = Path::new(".kenning.toml");
            if path.exists() {
                miette::bail!(".kenning.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .kenning.toml with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "kenning", &mut std::io::stdout());
        }
    }

    Ok(())
}
