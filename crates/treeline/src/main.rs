//! `treeline` renders outline documents from the command line.
//!
//! ```text
//! treeline outline plan.json --expand-all
//! treeline title plan.json --node task_3
//! treeline output plan.json --node task_3 --format json
//! ```
//!
//! Logging goes to stderr. `-v` raises the level (`-vv` for trace), and
//! `TREELINE_LOG` takes a full filter directive such as
//! `treeline_render=debug`.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::OutputFormat;

#[derive(Parser)]
#[command(name = "treeline")]
#[command(version)]
#[command(about = "Render outline documents as titles and HTML")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the outline as an indented tree of titles
    Outline {
        file: PathBuf,

        /// Expand every branch instead of only the roots
        #[arg(long)]
        expand_all: bool,
    },

    /// Print the title of one node
    Title {
        file: PathBuf,

        #[arg(long)]
        node: String,
    },

    /// Print the assembled output of a subtree
    Output {
        file: PathBuf,

        /// Node to render; defaults to the first root
        #[arg(long)]
        node: Option<String>,

        #[arg(long, value_enum, default_value = "html")]
        format: OutputFormat,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TREELINE_LOG").unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let text = match cli.command {
        Command::Outline { file, expand_all } => {
            let doc = commands::load(&file)?;
            let color = console::Term::stdout().features().colors_supported();
            commands::outline(&doc, expand_all, color)
        }
        Command::Title { file, node } => {
            let doc = commands::load(&file)?;
            commands::title(&doc, &node)?
        }
        Command::Output { file, node, format } => {
            let doc = commands::load(&file)?;
            commands::output(&doc, node.as_deref(), format)?
        }
    };

    tracing::debug!(bytes = text.len(), "rendered");
    if text.ends_with('\n') {
        print!("{}", text);
    } else {
        println!("{}", text);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_output_args() {
        let cli = Cli::try_parse_from([
            "treeline", "-vv", "output", "doc.json", "--node", "x", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Output { node, format, .. } => {
                assert_eq!(node.as_deref(), Some("x"));
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("expected output command"),
        }
    }

    #[test]
    fn test_title_requires_node() {
        assert!(Cli::try_parse_from(["treeline", "title", "doc.json"]).is_err());
    }
}
