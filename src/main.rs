use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use symnav::config::{load_config, Config};
use symnav::flatten::flatten_from;
use symnav::navigator::filter_entries;
use symnav::namespace::detect_declaration;
use symnav::profile::registry;
use symnav::render::{render_row, RenderRow};
use symnav::server::run_stdio_session;
use symnav::symbol::{BufferId, SymbolEntry};
use symnav::syntax::{outline, TreeSitterProvider};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "symnav")]
#[command(version)]
#[command(about = "Symbol outline and navigation engine (tree-sitter backed, JSON-lines session)")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the flattened symbol outline of a file
    Outline {
        file: PathBuf,

        /// Case-insensitive substring filter on qualified names
        #[arg(long, short = 'f')]
        filter: Option<String>,

        /// Emit render rows as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the namespace/package a file declares
    Namespace { file: PathBuf },

    /// List every symbol under a namespace across the workspace
    Workspace {
        namespace: String,

        /// Workspace root (defaults to the current directory)
        #[arg(long)]
        root: Option<PathBuf>,

        #[arg(long)]
        json: bool,
    },

    /// Run an interactive JSON-lines session on stdin/stdout
    Session {
        file: PathBuf,

        #[arg(long)]
        root: Option<PathBuf>,

        /// Override navigator.debounce_ms from config
        #[arg(long, value_name = "MS")]
        debounce_ms: Option<u64>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("symnav=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn workspace_root(root: Option<PathBuf>) -> Result<PathBuf> {
    let root = match root {
        Some(r) => r,
        None => std::env::current_dir().context("Failed to get current dir")?,
    };
    root.canonicalize()
        .with_context(|| format!("Workspace root does not exist: {}", root.display()))
}

fn print_rows(entries: &[SymbolEntry], buffer: &BufferId, config: &Config, json: bool) -> Result<()> {
    let rows: Vec<RenderRow> = entries
        .iter()
        .map(|e| render_row(e, buffer, &config.display))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for row in rows {
        let badges = if row.indicators.is_empty() {
            String::new()
        } else {
            format!("  [{}]", row.indicators.join(", "))
        };
        println!("{}{} {}{}", "  ".repeat(row.depth), row.glyph, row.formatted_path, badges);
    }
    Ok(())
}

fn read_source(file: &Path) -> Result<(PathBuf, String)> {
    let abs = file
        .canonicalize()
        .with_context(|| format!("File does not exist: {}", file.display()))?;
    let text = std::fs::read_to_string(&abs).with_context(|| format!("Failed to read {}", abs.display()))?;
    Ok((abs, text))
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.cmd {
        Command::Outline { file, filter, json } => {
            let (abs, text) = read_source(&file)?;
            let config = load_config(abs.parent().unwrap_or(Path::new(".")));
            let profile = registry().profile_for_path(&abs);
            let tree = outline(&text, &abs, profile)?;
            let entries = flatten_from(&tree, profile, None);
            let entries = match filter.as_deref() {
                Some(q) => filter_entries(&entries, q),
                None => entries,
            };
            print_rows(&entries, &BufferId::new(abs), &config, json)
        }
        Command::Namespace { file } => {
            let (abs, text) = read_source(&file)?;
            let profile = registry().profile_for_path(&abs);
            match detect_declaration(&text, &abs, profile) {
                Some(ns) => {
                    println!("{ns}");
                    Ok(())
                }
                None => bail!("No namespace or package declaration in {}", abs.display()),
            }
        }
        Command::Workspace { namespace, root, json } => {
            let root = workspace_root(root)?;
            let config = load_config(&root);
            let provider = TreeSitterProvider::new(&root, config.namespace.clone());
            let entries = provider.aggregate_namespace(&namespace)?;
            // Every entry names its file.
            print_rows(&entries, &BufferId::new(&root), &config, json)
        }
        Command::Session {
            file,
            root,
            debounce_ms,
        } => {
            let root = workspace_root(root)?;
            let mut config = load_config(&root);
            if let Some(ms) = debounce_ms {
                config.navigator.debounce_ms = ms;
            }
            run_stdio_session(root, file, config)
        }
    }
}
