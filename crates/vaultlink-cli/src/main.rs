//! vaultlink CLI: link canonicalization and directive banners for markdown vaults
//!
//! Commands: read, write, append, links, backlinks, update-links, check,
//! normalize, frontmatter, project, daily, watch, serve, completions

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use vaultlink_core::paths;
use vaultlink_core::VaultlinkConfig;
use vaultlink_mcp::VaultlinkMcpService;
use vaultlink_vault::templates::{self, ProjectTemplate};
use vaultlink_vault::{DocumentPipeline, FsVault, VaultEvent, VaultWatcher};

#[derive(Parser)]
#[command(name = "vaultlink")]
#[command(version)]
#[command(about = "Link canonicalization and front-matter directives for markdown vaults")]
struct Cli {
    /// Vault root directory
    #[arg(long, global = true, default_value = ".")]
    vault: PathBuf,

    /// Config file (default: <vault>/.vaultlink.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Print files, directive banner first
    #[command(alias = "cat")]
    Read {
        /// Vault-relative paths; several are printed under FILE headers
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Create or replace a file with normalized content
    Write {
        path: String,
        /// Content to store (default: read stdin)
        #[arg(long)]
        content: Option<String>,
        /// Read content from a file
        #[arg(long, conflicts_with = "content")]
        from_file: Option<PathBuf>,
    },
    /// Append normalized content to a file
    Append {
        path: String,
        /// Content to append (default: read stdin)
        #[arg(long)]
        content: Option<String>,
    },
    /// List the links in a file with their resolution status
    Links { path: String },
    /// List the files that link to a file
    Backlinks { path: String },
    /// Repoint links to a moved file; the file itself is not moved
    #[command(alias = "rename-links")]
    UpdateLinks {
        /// Path before the move
        old: String,
        /// Path after the move
        new: String,
    },
    /// Report files whose links are not canonical; exits 1 if any
    Check,
    /// Rewrite links to canonical form
    Normalize {
        /// Only this file (default: every markdown file)
        path: Option<String>,
        /// Report without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Read or edit front matter
    #[command(subcommand, alias = "fm")]
    Frontmatter(FrontmatterCommand),
    /// Create a project under Projects/
    Project {
        name: String,
        /// research_project or simple
        #[arg(long, default_value = "research_project")]
        template: String,
    },
    /// Create a daily progress note for a project
    Daily {
        project: String,
        /// YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// Watch the vault and keep the index current
    Watch {
        /// Normalize markdown files as they change
        #[arg(long)]
        normalize: bool,
    },
    /// Run the MCP server on stdio
    Serve,
    /// Print shell completions
    Completions { shell: clap_complete::Shell },
}

#[derive(clap::Subcommand)]
enum FrontmatterCommand {
    /// Print front matter as JSON
    Get { path: String },
    /// Set fields given as key=value (values are parsed as YAML)
    Set {
        path: String,
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// Remove a field
    Delete { path: String, field: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "warn" })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    if let Commands::Completions { shell } = cli.command {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "vaultlink", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli.vault, cli.config.as_deref())?;
    debug!(vault = %cli.vault.display(), ?config, "loaded config");

    match cli.command {
        Commands::Read { paths } => {
            let pipeline = open(&cli.vault, &config)?;
            if let [path] = paths.as_slice() {
                print!("{}", pipeline.read(path)?.text());
            } else {
                println!("{}", pipeline.read_batch(&paths));
            }
        }
        Commands::Write {
            path,
            content,
            from_file,
        } => {
            let content = match from_file {
                Some(file) => std::fs::read_to_string(&file)
                    .with_context(|| format!("reading {}", file.display()))?,
                None => content_or_stdin(content)?,
            };
            let mut pipeline = open(&cli.vault, &config)?;
            print_json(&pipeline.write(&path, &content)?)?;
        }
        Commands::Append { path, content } => {
            let content = content_or_stdin(content)?;
            let mut pipeline = open(&cli.vault, &config)?;
            print_json(&pipeline.append(&path, &content)?)?;
        }
        Commands::Links { path } => {
            let pipeline = open(&cli.vault, &config)?;
            print_json(&pipeline.links(&path)?)?;
        }
        Commands::Backlinks { path } => {
            let pipeline = open(&cli.vault, &config)?;
            print_json(&pipeline.backlinks(&path)?)?;
        }
        Commands::UpdateLinks { old, new } => {
            let mut pipeline = open(&cli.vault, &config)?;
            print_json(&pipeline.update_links(&old, &new)?)?;
        }
        Commands::Check => {
            let mut pipeline = open(&cli.vault, &config)?;
            let report = pipeline.normalize_vault(true)?;
            print_json(&report)?;
            if report.changed > 0 {
                std::process::exit(1);
            }
        }
        Commands::Normalize { path, dry_run } => {
            let mut pipeline = open(&cli.vault, &config)?;
            match path {
                Some(path) => print_json(&pipeline.normalize_file(&path, dry_run)?)?,
                None => print_json(&pipeline.normalize_vault(dry_run)?)?,
            }
        }
        Commands::Frontmatter(command) => {
            let mut pipeline = open(&cli.vault, &config)?;
            match command {
                FrontmatterCommand::Get { path } => print_json(&pipeline.front_matter(&path)?)?,
                FrontmatterCommand::Set { path, fields } => {
                    let updates = parse_fields(&fields)?;
                    print_json(&pipeline.update_front_matter(&path, updates)?)?;
                }
                FrontmatterCommand::Delete { path, field } => {
                    let removed = pipeline.delete_front_matter_field(&path, &field)?;
                    print_json(&serde_json::json!({
                        "path": path,
                        "field": field,
                        "removed": removed,
                    }))?;
                }
            }
        }
        Commands::Project { name, template } => {
            let mut pipeline = open(&cli.vault, &config)?;
            let template = ProjectTemplate::from_name(&template);
            print_json(&templates::create_project(&mut pipeline, &name, template)?)?;
        }
        Commands::Daily { project, date } => {
            let date = date.as_deref().map(templates::parse_date).transpose()?;
            let mut pipeline = open(&cli.vault, &config)?;
            let path = templates::create_daily_note(&mut pipeline, &project, date)?;
            print_json(&serde_json::json!({ "path": path }))?;
        }
        Commands::Watch { normalize } => {
            let vault = cli.vault.clone();
            tokio::task::spawn_blocking(move || watch(&vault, &config, normalize)).await??;
        }
        Commands::Serve => {
            use rmcp::ServiceExt;

            info!(vault = %cli.vault.display(), "starting MCP server on stdio");
            let service = VaultlinkMcpService::new(cli.vault.clone(), config);
            let server = service.serve(rmcp::transport::stdio()).await?;
            server.waiting().await?;
            info!("MCP server stopped");
        }
        Commands::Completions { .. } => {}
    }
    Ok(())
}

fn load_config(vault: &Path, explicit: Option<&Path>) -> Result<VaultlinkConfig> {
    let config = match explicit {
        Some(path) => VaultlinkConfig::load(path),
        None => VaultlinkConfig::load_for_vault(vault),
    };
    Ok(config?)
}

fn storage(vault: &Path, config: &VaultlinkConfig) -> FsVault {
    FsVault::new(vault).with_ignore(config.vault.ignore.clone())
}

fn open(vault: &Path, config: &VaultlinkConfig) -> Result<DocumentPipeline<FsVault>> {
    if !vault.is_dir() {
        bail!("vault directory not found: {}", vault.display());
    }
    Ok(DocumentPipeline::open(
        storage(vault, config),
        config.pipeline_options(),
    )?)
}

fn content_or_stdin(content: Option<String>) -> Result<String> {
    match content {
        Some(content) => Ok(content),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading content from stdin")?;
            Ok(buf)
        }
    }
}

/// Parse `key=value` arguments. Values are read as YAML so numbers, booleans
/// and flow lists keep their type; wikilinks stay strings.
fn parse_fields(fields: &[String]) -> Result<Mapping> {
    let mut updates = Mapping::new();
    for field in fields {
        let Some((key, raw)) = field.split_once('=') else {
            bail!("expected key=value, got '{field}'");
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("empty key in '{field}'");
        }
        let raw = raw.trim();
        let value = if raw.starts_with("[[") {
            Value::from(raw)
        } else {
            serde_yaml::from_str(raw).unwrap_or_else(|_| Value::from(raw))
        };
        updates.insert(Value::from(key), value);
    }
    Ok(updates)
}

fn watch(vault: &Path, config: &VaultlinkConfig, normalize: bool) -> Result<()> {
    let mut pipeline = open(vault, config)?;
    let watcher = VaultWatcher::start(pipeline.storage())?;
    info!(files = pipeline.index().file_count(), "watching vault");

    loop {
        let events = watcher.recv_batch(Duration::from_secs(60), Duration::from_millis(200));
        if events.is_empty() {
            continue;
        }
        pipeline.refresh_index()?;
        for event in events {
            let (kind, path) = match &event {
                VaultEvent::Changed(path) => ("changed", path),
                VaultEvent::Removed(path) => ("removed", path),
            };
            println!("{}", serde_json::json!({ "event": kind, "path": path }));

            if normalize && kind == "changed" && paths::is_markdown_path(path) {
                match pipeline.normalize_file(path, false) {
                    Ok(report) if report.changed => {
                        println!("{}", serde_json::to_string(&report)?);
                    }
                    Ok(_) => {}
                    // The file can vanish between the event and the read.
                    Err(err) => debug!(path = %path, error = %err, "skipped normalization"),
                }
            }
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
