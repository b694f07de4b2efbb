use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use skilldex::utils::progress;
use skilldex::{AppConfig, QuerySyntaxError, SkillIndex, output};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "skilldex")]
#[command(about = "Index and query skill-definition documents")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Config file (defaults to config.json in the app data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build or refresh the index and report what was indexed
    Index {
        /// Directory holding the skill documents
        corpus: PathBuf,

        /// Ignore the previous snapshot and reparse everything
        #[arg(short, long)]
        force: bool,
    },
    /// Run a query, e.g. `DamageAction where baseDamage > 100`
    Query {
        corpus: PathBuf,

        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Maximum results (0 = unlimited)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Per-group counts and numeric parameter summaries
    Stats {
        corpus: PathBuf,

        /// Field to group by
        #[arg(short, long, default_value = "action_type")]
        group_by: String,

        /// Only aggregate actions matching this query
        #[arg(short, long)]
        filter: Option<String>,

        #[arg(long)]
        json: bool,
    },
    /// Show one action by file and locator
    Detail {
        corpus: PathBuf,

        /// Path relative to the corpus root
        skill_file: String,

        /// Locator such as `tracks[0].actions[2]`
        json_path: String,

        #[arg(long)]
        json: bool,
    },
    /// Interactive query loop over one corpus
    Shell { corpus: PathBuf },
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let color = !cli.no_color;
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    match cli.command {
        Commands::Index { corpus, force } => {
            let index = SkillIndex::new(&corpus, config);
            let stats = with_spinner("Indexing...", || index.build_index(force))?;
            output::write_build_stats(&mut output::stdout(color), &stats)?;
        }
        Commands::Query {
            corpus,
            query,
            limit,
            json,
        } => {
            let index = open_index(&corpus, config)?;
            let query_text = query.join(" ");
            let limit = limit.unwrap_or(index.config().default_limit);
            match index.query(&query_text, limit) {
                Ok(result) if json => output::print_json(&result)?,
                Ok(result) => output::write_query_result(&mut output::stdout(color), &result)?,
                Err(e) => return report_query_error(&query_text, &e, color),
            }
        }
        Commands::Stats {
            corpus,
            group_by,
            filter,
            json,
        } => {
            let index = open_index(&corpus, config)?;
            match index.get_statistics(&group_by, filter.as_deref()) {
                Ok(stats) if json => output::print_json(&stats)?,
                Ok(stats) => output::write_stats(&mut output::stdout(color), &stats)?,
                Err(e) => {
                    return report_query_error(filter.as_deref().unwrap_or_default(), &e, color);
                }
            }
        }
        Commands::Detail {
            corpus,
            skill_file,
            json_path,
            json,
        } => {
            let index = open_index(&corpus, config)?;
            match index.get_action_detail(&skill_file, &json_path) {
                Some(detail) if json => output::print_json(&detail)?,
                Some(detail) => output::write_detail(&mut output::stdout(color), &detail)?,
                None => {
                    eprintln!("No action at {}:{}", skill_file, json_path);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
        Commands::Shell { corpus } => {
            let index = open_index(&corpus, config)?;
            run_shell(&index, color)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Build the index for `corpus`, warning about files that failed to parse
fn open_index(corpus: &Path, config: AppConfig) -> Result<SkillIndex> {
    let index = SkillIndex::new(corpus, config);
    let stats = with_spinner("Loading index...", || index.build_index(false))
        .with_context(|| format!("Failed to index {}", corpus.display()))?;
    if !stats.failed_files.is_empty() {
        eprintln!(
            "warning: {} of {} files could not be indexed (run `skilldex index` for details)",
            stats.failed_files.len(),
            stats.total_files
        );
    }
    Ok(index)
}

fn with_spinner<T>(message: &str, f: impl FnOnce() -> T) -> T {
    let spinner = progress::spinner(message);
    let result = f();
    spinner.finish_and_clear();
    result
}

fn report_query_error(query: &str, err: &QuerySyntaxError, color: bool) -> Result<ExitCode> {
    output::write_query_error(&mut output::stderr(color), query, err)?;
    Ok(ExitCode::from(2))
}

const SHELL_HELP: &str = "\
Enter a query, or one of:
  :stats [field] [where ...]   group statistics (default field: action_type)
  :detail <file> <json_path>   show one action
  :cache                       cache statistics
  :clear                       clear the result cache
  :rebuild                     incremental rebuild
  :quit                        exit";

fn run_shell(index: &SkillIndex, color: bool) -> Result<()> {
    let snapshot = index.snapshot();
    println!(
        "{} actions from {} files. Type :help for commands.",
        snapshot.total_actions, snapshot.indexed_files
    );
    drop(snapshot);

    let stdin = io::stdin();
    let mut out = output::stdout(color);
    let limit = index.config().default_limit;

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        match command {
            ":quit" | ":q" | ":exit" => break,
            ":help" | ":h" => println!("{}", SHELL_HELP),
            ":cache" => output::write_cache_stats(&mut out, &index.get_cache_stats())?,
            ":clear" => {
                index.clear_cache();
                println!("cache cleared");
            }
            ":rebuild" => match with_spinner("Rebuilding...", || index.build_index(false)) {
                Ok(stats) => output::write_build_stats(&mut out, &stats)?,
                Err(e) => eprintln!("rebuild failed: {}", e),
            },
            ":stats" => {
                let (group_by, filter) = match rest.split_once(' ') {
                    Some((field, filter)) => (field, Some(filter.trim())),
                    None if rest.is_empty() => ("action_type", None),
                    None => (rest, None),
                };
                match index.get_statistics(group_by, filter) {
                    Ok(stats) => output::write_stats(&mut out, &stats)?,
                    Err(e) => {
                        output::write_query_error(&mut output::stderr(color), filter.unwrap_or_default(), &e)?
                    }
                }
            }
            ":detail" => match rest.split_once(' ') {
                Some((file, path)) => match index.get_action_detail(file, path.trim()) {
                    Some(detail) => output::write_detail(&mut out, &detail)?,
                    None => println!("no action at {}:{}", file, path.trim()),
                },
                None => println!("usage: :detail <file> <json_path>"),
            },
            _ if command.starts_with(':') => {
                println!("unknown command {} (try :help)", command);
            }
            _ => match index.query(line, limit) {
                Ok(result) => output::write_query_result(&mut out, &result)?,
                Err(e) => output::write_query_error(&mut output::stderr(color), line, &e)?,
            },
        }
    }

    Ok(())
}
