use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use regscout::{
    persist, Blacklist, CliOverrides, Hive, MemoryStore, RegistrySearcher, RegistryStore,
    SearchConfig, SearchHistory, SearchMode, SearchReport,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Refresh interval of the elapsed-time display
const PROGRESS_TICK: Duration = Duration::from_millis(25);

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CliSearchOptions {
    /// Registry snapshot (YAML or JSON) to search instead of the live registry
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Exclude keys whose path contains this text (can be specified multiple times)
    #[arg(short = 'b', long = "blacklist")]
    blacklist: Vec<String>,

    /// Report matches from every key, ignoring any blacklist
    #[arg(long, conflicts_with = "blacklist")]
    no_blacklist: bool,

    /// Worker layout (single|multi)
    #[arg(short = 'm', long, value_parser = parse_mode)]
    mode: Option<SearchMode>,

    /// Hive to search, e.g. HKCU or HKEY_LOCAL_MACHINE (can be specified multiple times)
    #[arg(short = 'r', long = "root", value_parser = parse_hive)]
    roots: Vec<Hive>,

    /// Directory for saved reports (default: desktop)
    #[arg(short = 'o', long)]
    output_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

impl CliSearchOptions {
    fn overrides(&self, target: Option<String>) -> CliOverrides {
        let blacklist = if self.no_blacklist {
            Some(Blacklist::empty())
        } else if !self.blacklist.is_empty() {
            Some(Blacklist::new(&self.blacklist))
        } else {
            None
        };
        CliOverrides {
            target,
            blacklist,
            mode: self.mode,
            roots: (!self.roots.is_empty()).then(|| self.roots.clone()),
            snapshot: self.snapshot.clone(),
            output_dir: self.output_dir.clone(),
            log_level: self.log_level.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Search the registry once and print the report
    Search {
        /// Text to look for in value names and string values
        target: Option<String>,

        /// Save the report to a file
        #[arg(short, long)]
        save: bool,

        /// Show only the summary line, not the matches
        #[arg(long)]
        stats: bool,

        #[command(flatten)]
        options: CliSearchOptions,
    },

    /// Prompt for search targets repeatedly, keeping a history of reports
    Interactive {
        #[command(flatten)]
        options: CliSearchOptions,
    },
}

fn parse_mode(s: &str) -> std::result::Result<SearchMode, String> {
    SearchMode::parse(s).ok_or_else(|| format!("unknown mode '{}', expected single or multi", s))
}

fn parse_hive(s: &str) -> std::result::Result<Hive, String> {
    Hive::parse(s).ok_or_else(|| format!("unknown hive '{}'", s))
}

/// The store a search runs against
enum Backend {
    Snapshot(MemoryStore),
    #[cfg(windows)]
    Live(regscout::store::WindowsRegistry),
}

impl Backend {
    fn open(config: &SearchConfig) -> Result<Self> {
        if let Some(path) = &config.snapshot {
            let store = MemoryStore::load(path)
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
            info!("Searching snapshot {}", path.display());
            return Ok(Backend::Snapshot(store));
        }
        #[cfg(windows)]
        {
            Ok(Backend::Live(regscout::store::WindowsRegistry::new()))
        }
        #[cfg(not(windows))]
        {
            bail!("The live registry is only available on Windows; pass --snapshot <file>")
        }
    }

    fn search(
        &self,
        config: &SearchConfig,
        history: &SearchHistory,
        show_progress: bool,
    ) -> Result<SearchReport> {
        match self {
            Backend::Snapshot(store) => run_search(store, config, history, show_progress),
            #[cfg(windows)]
            Backend::Live(store) => run_search(store, config, history, show_progress),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let file_config = SearchConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Search {
            target,
            save,
            stats,
            options,
        } => {
            let config = file_config.merge_with_cli(options.overrides(target));
            init_logging(&config.log_level);
            if config.target.is_empty() {
                bail!("No search target given");
            }

            let backend = Backend::open(&config)?;
            let history = SearchHistory::new();
            let report = backend.search(&config, &history, true)?;
            print_report(&report, stats);
            if save {
                save_report(&report, &config);
            }
            Ok(())
        }
        Commands::Interactive { options } => {
            let config = file_config.merge_with_cli(options.overrides(None));
            init_logging(&config.log_level);
            let backend = Backend::open(&config)?;
            let stdin = io::stdin();
            interactive(&backend, config, &mut stdin.lock())
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Runs one search while a spinner shows the elapsed time until the searcher
/// reports that it has finished.
fn run_search<S: RegistryStore>(
    store: &S,
    config: &SearchConfig,
    history: &SearchHistory,
    show_progress: bool,
) -> Result<SearchReport> {
    let searcher = RegistrySearcher::from_config(config);
    let returned = AtomicBool::new(false);

    let report = thread::scope(|s| {
        if show_progress {
            s.spawn(|| show_elapsed(&searcher, &returned));
        }
        let report = searcher.run(store, history);
        returned.store(true, Ordering::Release);
        report
    })?;
    Ok(report)
}

fn show_elapsed(searcher: &RegistrySearcher, returned: &AtomicBool) {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let start = Instant::now();
    while !searcher.is_finished() && !returned.load(Ordering::Acquire) {
        let progress = searcher.progress();
        bar.set_message(format!(
            "Elapsed {:.2} sec | Keys: {} | Hits: {} | Failed: {}",
            start.elapsed().as_secs_f64(),
            progress.keys_opened,
            progress.raw_matches,
            progress.failed_nodes
        ));
        bar.tick();
        thread::sleep(PROGRESS_TICK);
    }
    bar.finish_and_clear();
}

fn print_report(report: &SearchReport, stats_only: bool) {
    if stats_only {
        println!("{}", report.summary.green());
    } else {
        println!("{}", report.rendered().green());
    }
}

/// Saves the report, printing where it went or why it could not be written.
fn save_report(report: &SearchReport, config: &SearchConfig) {
    let dir = config
        .output_dir
        .clone()
        .unwrap_or_else(persist::default_output_dir);
    match persist::save_report(report.rendered(), &dir) {
        Ok(path) => println!(
            "{}",
            format!("Scan result saved to \"{}\".", path.display()).red()
        ),
        Err(e) => println!("{}", format!("Failed to save scan result: {}", e).red()),
    }
}

/// Prints `message` and reads one line; `None` at end of input.
fn prompt<R: BufRead>(input: &mut R, message: &str) -> Result<Option<String>> {
    print!("{}", message.white());
    io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        println!();
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn is_yes(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}

/// The prompt loop: review history, search, offer to save, start over.
fn interactive<R: BufRead>(backend: &Backend, mut config: SearchConfig, input: &mut R) -> Result<()> {
    let history = SearchHistory::new();
    loop {
        if !history.is_empty() {
            let Some(answer) = prompt(input, "Press Y to view the history of found matches > ")?
            else {
                return Ok(());
            };
            if is_yes(&answer) {
                for entry in history.all() {
                    println!("{}", entry.green());
                }
            }
        }

        let Some(target) = prompt(input, "Enter something to find > ")? else {
            return Ok(());
        };
        config.target = target;
        let report = backend.search(&config, &history, true)?;
        print_report(&report, false);

        let Some(answer) = prompt(input, "Press Y to save the result > ")? else {
            return Ok(());
        };
        if is_yes(&answer) {
            save_report(&report, &config);
        }

        let Some(answer) = prompt(
            input,
            "Press Enter to exit or type anything to start again > ",
        )?
        else {
            return Ok(());
        };
        if answer.trim().is_empty() {
            return Ok(());
        }
    }
}
