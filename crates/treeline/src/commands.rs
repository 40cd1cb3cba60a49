//! Command implementations. Each returns the text to print.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use console::Style;
use treeline_render::{Document, Glyph, OutlineView, OutputGroup};

/// Output encodings for the `output` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Html,
    Json,
}

pub fn load(path: &Path) -> Result<Document> {
    Document::open(path).with_context(|| format!("failed to load {}", path.display()))
}

/// Glyph plus indented title for every visible row.
pub fn outline(doc: &Document, expand_all: bool, color: bool) -> String {
    let mut view = OutlineView::new(doc);
    if expand_all {
        view.expand_all();
    } else {
        for &root in doc.roots() {
            view.expand(root);
        }
    }

    let glyph_style = Style::new().dim().force_styling(color);
    let branch_style = Style::new().bold().force_styling(color);

    let mut text = String::new();
    for row in view.rows() {
        let title = if row.glyph == Glyph::Leaf {
            row.title
        } else {
            branch_style.apply_to(row.title).to_string()
        };
        text.push_str(&format!(
            "{}{} {}\n",
            "  ".repeat(row.depth),
            glyph_style.apply_to(row.glyph),
            title
        ));
    }
    text
}

pub fn title(doc: &Document, node: &str) -> Result<String> {
    let pos = doc
        .find_position(node)
        .ok_or_else(|| anyhow!("no node with id '{}'", node))?;
    Ok(doc.title(pos))
}

/// Assembled output of a subtree, the first root's by default.
pub fn output(doc: &Document, node: Option<&str>, format: OutputFormat) -> Result<String> {
    let pos = match node {
        Some(id) => doc
            .find_position(id)
            .ok_or_else(|| anyhow!("no node with id '{}'", id))?,
        None => match doc.roots().first() {
            Some(&root) => root,
            None => return Ok(String::new()),
        },
    };

    let group = OutputGroup::for_subtree(doc, pos);
    match format {
        OutputFormat::Html => Ok(group.to_html()),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&group).context("failed to encode output items")
        }
    }
}
