use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use paperlens_core::graph::{ENTITIES, GRAPH_LAYOUT, GraphLayout, default_edges, to_mermaid};
use paperlens_core::{DisplayPatternStore, Entity, GraphNode, PatternStore, bibtex};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

const APP_NAME: &str = "paperlens";
const DEFAULT_BASE_URL: &str = "http://localhost:5173";

#[derive(Parser)]
#[command(name = APP_NAME, version)]
#[command(about = "paperlens — bibliographies and interaction patterns for GenAI papers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize a .bib file and print its entries as JSON
    Bib {
        /// Path to the .bib file
        file: PathBuf,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Show the human–GenAI entity taxonomy
    Entities {
        /// Print a Mermaid flowchart of every relation
        #[arg(short, long, conflicts_with = "json")]
        mermaid: bool,

        /// Print entities and layout as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show saved pattern metadata
    Patterns {
        /// Site serving /Patterns.json
        #[arg(long, env = "PAPERLENS_PATTERNS_URL", default_value = DEFAULT_BASE_URL)]
        base_url: String,

        /// Read a local Patterns.json instead (takes precedence over --base-url)
        #[arg(long, env = "PAPERLENS_PATTERNS_FILE")]
        file: Option<PathBuf>,

        /// Only print this pattern
        id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Bib { file, pretty } => {
            let content = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let entries = bibtex::parse_bibtex_file(&content);
            tracing::debug!(path = %file.display(), entries = entries.len(), "normalized bibliography");
            let output = if pretty {
                serde_json::to_string_pretty(&entries)?
            } else {
                serde_json::to_string(&entries)?
            };
            println!("{output}");
        }
        Command::Entities { mermaid, json } => {
            if mermaid {
                println!("{}", to_mermaid(&default_edges()));
            } else if json {
                let view = TaxonomyView {
                    entities: &ENTITIES,
                    layout: GRAPH_LAYOUT,
                    nodes: GRAPH_LAYOUT.nodes(),
                };
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                print!("{}", render_entities());
            }
        }
        Command::Patterns { base_url, file, id } => {
            let store = match file {
                Some(path) => DisplayPatternStore::from_file(path)?,
                None => DisplayPatternStore::from_base_url(&base_url)?,
            };

            match id {
                Some(id) => match store.get_pattern_info(&id).await {
                    Some(info) => println!("{}", serde_json::to_string_pretty(&info)?),
                    None => {
                        eprintln!("pattern not found: {id}");
                        return Ok(ExitCode::FAILURE);
                    }
                },
                None => {
                    let storage = store.load().await;
                    println!("{}", serde_json::to_string_pretty(&storage)?);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Serialize)]
struct TaxonomyView<'a> {
    entities: &'a [Entity],
    layout: GraphLayout,
    nodes: Vec<GraphNode>,
}

const DIVIDER: &str = "─────────────────────────────────────────────────────────────";
const LABEL_WIDTH: usize = 6;

fn push_section_header(buf: &mut String, title: &str) {
    let _ = writeln!(buf, "{DIVIDER}");
    let _ = writeln!(buf, "{title}");
    let _ = writeln!(buf, "{DIVIDER}");
}

fn push_key_value(buf: &mut String, label: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    let _ = writeln!(buf, "• {:<width$} : {}", label, value, width = LABEL_WIDTH);
}

fn render_entities() -> String {
    let mut output = String::new();

    for entity in &ENTITIES {
        push_section_header(
            &mut output,
            &format!("{} — {}", entity.entity_type, entity.name),
        );
        let _ = writeln!(output, "{}\n", entity.description);
        for link in entity.linked_entities {
            push_key_value(&mut output, &format!("→ {}", link.to), link.purpose);
        }
        let _ = writeln!(output);
    }

    push_section_header(&mut output, "Layout");
    for row in 0..2 {
        let cells: Vec<String> = GRAPH_LAYOUT
            .nodes
            .iter()
            .filter(|slot| slot.row == row)
            .map(|slot| format!("{:<4}", slot.entity_type.as_str()))
            .collect();
        let _ = writeln!(output, "{}", cells.join(" ").trim_end());
    }

    output
}
