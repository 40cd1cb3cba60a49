//! Output assembly for a selected subtree.
//!
//! [`OutputGroup::for_subtree`] collects one [`OutputItem`] per position
//! below (and including) the selection, in depth-first pre-order, each
//! holding that node's rendered output lines. [`OutputGroup::assemble`]
//! then runs the layout passes in order:
//!
//! 1. **decorate**: line breaks, `<li>` bullets, `<tr><td>` table rows.
//! 2. **merge**: consecutive same-level siblings sharing a wrapper are
//!    joined into one item enclosed by `<ul>`/`</ul>` or
//!    `<table>`/`</table>`.
//! 3. **spacing**: a `<br />` line between items that ask for one.
//! 4. **indent**: `<div class="indent">` and `</div>` around level changes.

use serde::Serialize;

use crate::document::{Document, PositionId};

const BREAK: &str = "<br />";
const INDENT_OPEN: &str = "<div class=\"indent\">";
const INDENT_CLOSE: &str = "</div>";

/// How an item's lines are decorated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStyle {
    #[default]
    Plain,
    Bullets,
    Table,
}

/// The rendered output of one position.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct OutputItem {
    pub position: String,
    pub level: usize,
    pub lines: Vec<String>,
    pub add_space: bool,
    pub style: ItemStyle,
    pub sibling_prefix: String,
    pub sibling_suffix: String,
}

impl OutputItem {
    pub fn new(position: impl Into<String>, level: usize, lines: Vec<String>) -> Self {
        OutputItem {
            position: position.into(),
            level,
            lines,
            ..Self::default()
        }
    }

    fn has_wrapper(&self) -> bool {
        !self.sibling_prefix.is_empty() || !self.sibling_suffix.is_empty()
    }

    fn same_wrapper(&self, other: &OutputItem) -> bool {
        self.level == other.level
            && self.sibling_prefix == other.sibling_prefix
            && self.sibling_suffix == other.sibling_suffix
    }

    fn decorate(&mut self) {
        match self.style {
            ItemStyle::Table => {
                let cells: String = self
                    .lines
                    .iter()
                    .map(|line| format!("<td>{}</td>", line))
                    .collect();
                self.lines = vec![format!("<tr>{}</tr>", cells)];
            }
            ItemStyle::Plain | ItemStyle::Bullets => {
                for line in &mut self.lines {
                    line.push_str(BREAK);
                }
                if self.style == ItemStyle::Bullets {
                    self.first_line().insert_str(0, "<li>");
                    self.last_line().push_str("</li>");
                }
            }
        }
    }

    fn first_line(&mut self) -> &mut String {
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        &mut self.lines[0]
    }

    fn last_line(&mut self) -> &mut String {
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        let last = self.lines.len() - 1;
        &mut self.lines[last]
    }
}

/// The items of a subtree, ready for layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputGroup {
    items: Vec<OutputItem>,
    #[serde(skip)]
    decorated: bool,
}

impl OutputGroup {
    pub fn new(items: Vec<OutputItem>) -> Self {
        OutputGroup {
            items,
            decorated: false,
        }
    }

    /// Collects the output of `root` and all of its descendants.
    ///
    /// Positions that render no lines are left out.
    pub fn for_subtree(doc: &Document, root: PositionId) -> Self {
        let base = doc.depth(root);
        let items = doc
            .descendants(root)
            .into_iter()
            .filter_map(|pos| {
                let lines = doc.output_lines(pos);
                if lines.is_empty() {
                    return None;
                }
                let format = doc.format_of(pos);
                let layout = format.layout();
                let style = if layout.tables {
                    ItemStyle::Table
                } else if layout.bullets {
                    ItemStyle::Bullets
                } else {
                    ItemStyle::Plain
                };
                Some(OutputItem {
                    position: doc.position_id(pos).to_string(),
                    level: doc.depth(pos) - base,
                    lines,
                    add_space: layout.space_between,
                    style,
                    sibling_prefix: format.sibling_prefix().to_string(),
                    sibling_suffix: format.sibling_suffix().to_string(),
                })
            })
            .collect();
        OutputGroup::new(items)
    }

    pub fn items(&self) -> &[OutputItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds line breaks, bullets and table rows. Runs at most once.
    pub fn decorate(&mut self) {
        if self.decorated {
            return;
        }
        for item in &mut self.items {
            item.decorate();
        }
        self.decorated = true;
    }

    /// Joins runs of wrapped siblings into single wrapped items.
    ///
    /// Merged items carry no wrapper afterwards, so running this twice
    /// changes nothing.
    pub fn merge_siblings(&mut self) {
        if !self.items.iter().any(OutputItem::has_wrapper) {
            return;
        }

        let mut merged: Vec<OutputItem> = Vec::with_capacity(self.items.len());
        let mut open: Option<OutputItem> = None;

        for item in self.items.drain(..) {
            if let Some(current) = open.as_mut() {
                if item.has_wrapper() && current.same_wrapper(&item) {
                    if current.add_space || item.add_space {
                        current.lines.push(BREAK.to_string());
                    }
                    current.add_space |= item.add_space;
                    current.lines.extend(item.lines);
                    continue;
                }
            }
            if let Some(done) = open.take() {
                merged.push(close_wrapper(done));
            }
            if item.has_wrapper() {
                open = Some(item);
            } else {
                merged.push(item);
            }
        }
        if let Some(done) = open {
            merged.push(close_wrapper(done));
        }
        self.items = merged;
    }

    /// Inserts a break line between adjacent items when either asks for it.
    pub fn add_spacing(&mut self) {
        for idx in 1..self.items.len() {
            if self.items[idx - 1].add_space || self.items[idx].add_space {
                self.items[idx].lines.insert(0, BREAK.to_string());
            }
        }
    }

    /// Opens and closes indent blocks at level changes, ending at level 0.
    pub fn add_indents(&mut self) {
        let mut prev_level = 0;
        for idx in 0..self.items.len() {
            let level = self.items[idx].level;
            if level > prev_level {
                self.items[idx]
                    .first_line()
                    .insert_str(0, &INDENT_OPEN.repeat(level - prev_level));
            } else if level < prev_level && idx > 0 {
                self.items[idx - 1]
                    .last_line()
                    .push_str(&INDENT_CLOSE.repeat(prev_level - level));
            }
            prev_level = level;
        }
        if prev_level > 0 {
            if let Some(last) = self.items.last_mut() {
                last.last_line().push_str(&INDENT_CLOSE.repeat(prev_level));
            }
        }
    }

    /// Flattens the items into output lines, dropping empty ones.
    pub fn into_lines(self) -> Vec<String> {
        self.items
            .into_iter()
            .flat_map(|item| item.lines)
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Runs every layout pass and returns the final lines.
    pub fn assemble(mut self) -> Vec<String> {
        self.decorate();
        self.merge_siblings();
        self.add_spacing();
        self.add_indents();
        self.into_lines()
    }

    pub fn to_html(self) -> String {
        self.assemble().join("\n")
    }
}

fn close_wrapper(mut item: OutputItem) -> OutputItem {
    let prefix = std::mem::take(&mut item.sibling_prefix);
    let suffix = std::mem::take(&mut item.sibling_suffix);
    item.lines.insert(0, prefix);
    item.lines.push(suffix);
    item
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, level: usize, lines: &[&str]) -> OutputItem {
        OutputItem::new(id, level, lines.iter().map(|l| l.to_string()).collect())
    }

    fn bullet(id: &str, level: usize, line: &str) -> OutputItem {
        OutputItem {
            style: ItemStyle::Bullets,
            sibling_prefix: "<ul>".into(),
            sibling_suffix: "</ul>".into(),
            ..item(id, level, &[line])
        }
    }

    #[test]
    fn test_plain_lines_get_breaks() {
        let group = OutputGroup::new(vec![item("a", 0, &["one", "two"])]);
        assert_eq!(group.assemble(), vec!["one<br />", "two<br />"]);
    }

    #[test]
    fn test_table_rows() {
        let row = OutputItem {
            style: ItemStyle::Table,
            sibling_prefix: "<table>".into(),
            sibling_suffix: "</table>".into(),
            ..item("a", 0, &["x", ""])
        };
        let group = OutputGroup::new(vec![row]);
        assert_eq!(
            group.assemble(),
            vec!["<table>", "<tr><td>x</td><td></td></tr>", "</table>"]
        );
    }

    #[test]
    fn test_bullets_merge_into_one_list() {
        let group = OutputGroup::new(vec![bullet("a", 0, "one"), bullet("b", 0, "two")]);
        assert_eq!(
            group.assemble(),
            vec!["<ul>", "<li>one<br /></li>", "<li>two<br /></li>", "</ul>"]
        );
    }

    #[test]
    fn test_merge_stops_at_level_change() {
        let mut group = OutputGroup::new(vec![
            bullet("a", 0, "one"),
            bullet("c", 1, "child"),
            bullet("b", 0, "two"),
        ]);
        group.decorate();
        group.merge_siblings();
        assert_eq!(group.items().len(), 3);
        assert!(group.items().iter().all(|i| i.sibling_prefix.is_empty()));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut group = OutputGroup::new(vec![
            bullet("a", 0, "one"),
            bullet("b", 0, "two"),
            item("c", 0, &["plain"]),
        ]);
        group.decorate();
        group.merge_siblings();
        let once = group.clone();
        group.merge_siblings();
        assert_eq!(group, once);
    }

    #[test]
    fn test_decorate_runs_once() {
        let mut group = OutputGroup::new(vec![item("a", 0, &["x"])]);
        group.decorate();
        group.decorate();
        assert_eq!(group.items()[0].lines, vec!["x<br />"]);
    }

    #[test]
    fn test_merged_spacing() {
        let mut first = bullet("a", 0, "one");
        first.add_space = true;
        let group = OutputGroup::new(vec![first, bullet("b", 0, "two")]);
        assert_eq!(
            group.assemble(),
            vec![
                "<ul>",
                "<li>one<br /></li>",
                "<br />",
                "<li>two<br /></li>",
                "</ul>"
            ]
        );
    }

    #[test]
    fn test_merged_group_keeps_later_spacing() {
        let mut second = bullet("b", 0, "two");
        second.add_space = true;
        let group = OutputGroup::new(vec![
            bullet("a", 0, "one"),
            second,
            item("c", 0, &["after"]),
        ]);
        assert_eq!(
            group.assemble(),
            vec![
                "<ul>",
                "<li>one<br /></li>",
                "<br />",
                "<li>two<br /></li>",
                "</ul>",
                "<br />",
                "after<br />"
            ]
        );
    }

    #[test]
    fn test_spacing_between_items() {
        let mut first = item("a", 0, &["one"]);
        first.add_space = true;
        let group = OutputGroup::new(vec![first, item("b", 0, &["two"])]);
        assert_eq!(group.assemble(), vec!["one<br />", "<br />", "two<br />"]);
    }

    #[test]
    fn test_indents() {
        let group = OutputGroup::new(vec![
            item("a", 0, &["root"]),
            item("b", 1, &["child"]),
            item("c", 2, &["grandchild"]),
            item("d", 0, &["sibling"]),
            item("e", 1, &["last"]),
        ]);
        assert_eq!(
            group.assemble(),
            vec![
                "root<br />",
                "<div class=\"indent\">child<br />",
                "<div class=\"indent\">grandchild<br /></div></div>",
                "sibling<br />",
                "<div class=\"indent\">last<br /></div>",
            ]
        );
    }

    #[test]
    fn test_empty_group() {
        assert!(OutputGroup::default().assemble().is_empty());
    }
}
