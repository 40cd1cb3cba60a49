//! A headless outline view.
//!
//! [`OutlineView`] holds the only mutable state of a render session: which
//! positions are expanded and which one is selected. It borrows the
//! [`Document`] immutably, so any number of views can share one document.
//! All positions start collapsed.

use std::fmt;

use crate::document::{Document, PositionId};
use crate::output::OutputGroup;

/// The marker drawn in front of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    Closed,
    Open,
    Leaf,
}

impl Glyph {
    pub fn symbol(self) -> char {
        match self {
            Glyph::Closed => '▸',
            Glyph::Open => '▾',
            Glyph::Leaf => '◦',
        }
    }
}

impl fmt::Display for Glyph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Navigation keys understood by [`OutlineView::handle_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
}

/// One visible line of the outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub position: PositionId,
    pub id: String,
    pub depth: usize,
    pub glyph: Glyph,
    pub title: String,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub struct OutlineView<'a> {
    doc: &'a Document,
    open: Vec<bool>,
    selected: Option<PositionId>,
}

impl<'a> OutlineView<'a> {
    pub fn new(doc: &'a Document) -> Self {
        OutlineView {
            doc,
            open: vec![false; doc.position_count()],
            selected: None,
        }
    }

    pub fn document(&self) -> &'a Document {
        self.doc
    }

    pub fn selected(&self) -> Option<PositionId> {
        self.selected
    }

    pub fn is_open(&self, pos: PositionId) -> bool {
        self.open[pos.0]
    }

    pub fn glyph(&self, pos: PositionId) -> Glyph {
        if self.doc.children(pos).is_empty() {
            Glyph::Leaf
        } else if self.is_open(pos) {
            Glyph::Open
        } else {
            Glyph::Closed
        }
    }

    /// Visible positions in tree order.
    pub fn visible(&self) -> Vec<PositionId> {
        let mut result = Vec::new();
        let mut stack: Vec<PositionId> = self.doc.roots().iter().rev().copied().collect();
        while let Some(pos) = stack.pop() {
            result.push(pos);
            if self.is_open(pos) {
                stack.extend(self.doc.children(pos).iter().rev().copied());
            }
        }
        result
    }

    pub fn is_visible(&self, pos: PositionId) -> bool {
        let mut current = self.doc.parent(pos);
        while let Some(parent) = current {
            if !self.is_open(parent) {
                return false;
            }
            current = self.doc.parent(parent);
        }
        true
    }

    pub fn rows(&self) -> Vec<Row> {
        self.visible()
            .into_iter()
            .map(|pos| Row {
                position: pos,
                id: self.doc.position_id(pos).to_string(),
                depth: self.doc.depth(pos),
                glyph: self.glyph(pos),
                title: self.doc.title(pos),
                selected: self.selected == Some(pos),
            })
            .collect()
    }

    /// Selects a position by id and returns its assembled output.
    pub fn select_id(&mut self, id: &str) -> Option<String> {
        let pos = self.doc.find_position(id)?;
        Some(self.select(pos))
    }

    /// Selects a position and returns its assembled output.
    ///
    /// Selecting a hidden position expands its ancestors.
    pub fn select(&mut self, pos: PositionId) -> String {
        let mut current = self.doc.parent(pos);
        while let Some(parent) = current {
            self.open[parent.0] = true;
            current = self.doc.parent(parent);
        }
        self.selected = Some(pos);
        self.output()
    }

    /// The assembled output of the current selection, or `""`.
    pub fn output(&self) -> String {
        match self.selected {
            Some(pos) => OutputGroup::for_subtree(self.doc, pos).to_html(),
            None => String::new(),
        }
    }

    pub fn expand(&mut self, pos: PositionId) {
        self.open[pos.0] = true;
    }

    /// Collapses `pos`. A selection hidden by this moves up to `pos`.
    pub fn collapse(&mut self, pos: PositionId) {
        self.open[pos.0] = false;
        if let Some(selected) = self.selected {
            if !self.is_visible(selected) {
                self.selected = Some(self.nearest_visible(selected));
            }
        }
    }

    pub fn toggle(&mut self, pos: PositionId) {
        if self.is_open(pos) {
            self.collapse(pos);
        } else {
            self.expand(pos);
        }
    }

    pub fn expand_all(&mut self) {
        self.open.iter_mut().for_each(|open| *open = true);
    }

    fn nearest_visible(&self, pos: PositionId) -> PositionId {
        let mut current = pos;
        while !self.is_visible(current) {
            match self.doc.parent(current) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// Applies a navigation key.
    ///
    /// Returns the new output when the selection changed.
    pub fn handle_key(&mut self, key: Key) -> Option<String> {
        match key {
            Key::Up | Key::Down => {
                let visible = self.visible();
                let current = self
                    .selected
                    .and_then(|s| visible.iter().position(|&p| p == s));
                let target = match current {
                    None => visible.first().copied(),
                    Some(idx) if key == Key::Up => idx.checked_sub(1).map(|i| visible[i]),
                    Some(idx) => visible.get(idx + 1).copied(),
                }?;
                Some(self.select(target))
            }
            Key::Left => {
                let selected = self.selected?;
                self.collapse(selected);
                None
            }
            Key::Right => {
                let selected = self.selected?;
                self.expand(selected);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::from_json(
            r#"{
                "formats": {"Item": {
                    "titleline": "{*Name*}",
                    "outputlines": ["{*Name*}"],
                    "fields": [{"fieldname": "Name"}]
                }},
                "nodes": [
                    {"id": "r", "format": "Item", "data": {"Name": "Root"}, "children": ["a", "b"]},
                    {"id": "a", "format": "Item", "data": {"Name": "A"}, "children": ["c"]},
                    {"id": "b", "format": "Item", "data": {"Name": "B"}},
                    {"id": "c", "format": "Item", "data": {"Name": "C"}}
                ]
            }"#,
        )
        .unwrap()
    }

    fn ids(view: &OutlineView) -> Vec<String> {
        view.rows().into_iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_starts_collapsed() {
        let doc = doc();
        let view = OutlineView::new(&doc);
        let rows = view.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].glyph, Glyph::Closed);
        assert_eq!(rows[0].title, "Root");
    }

    #[test]
    fn test_toggle_only_changes_one_position() {
        let doc = doc();
        let mut view = OutlineView::new(&doc);
        let root = doc.roots()[0];
        view.toggle(root);
        assert_eq!(ids(&view), vec!["r", "a", "b"]);
        let a = doc.find_position("a").unwrap();
        assert!(!view.is_open(a));
        assert_eq!(view.glyph(root), Glyph::Open);
        assert_eq!(view.glyph(doc.find_position("b").unwrap()), Glyph::Leaf);
    }

    #[test]
    fn test_expand_all() {
        let doc = doc();
        let mut view = OutlineView::new(&doc);
        view.expand_all();
        assert_eq!(ids(&view), vec!["r", "a", "c", "b"]);
    }

    #[test]
    fn test_select_returns_subtree_output() {
        let doc = doc();
        let mut view = OutlineView::new(&doc);
        let html = view.select_id("a").unwrap();
        assert_eq!(html, "A<br />\n<div class=\"indent\">C<br /></div>");
        assert!(view.is_visible(doc.find_position("a").unwrap()));
        assert!(view.select_id("missing").is_none());
    }

    #[test]
    fn test_collapse_moves_hidden_selection_up() {
        let doc = doc();
        let mut view = OutlineView::new(&doc);
        view.select_id("c");
        view.collapse(doc.roots()[0]);
        assert_eq!(view.selected(), Some(doc.roots()[0]));
    }

    #[test]
    fn test_keyboard_navigation() {
        let doc = doc();
        let mut view = OutlineView::new(&doc);
        assert!(view.handle_key(Key::Down).is_some());
        assert_eq!(view.selected(), Some(doc.roots()[0]));

        assert!(view.handle_key(Key::Down).is_none());
        view.handle_key(Key::Right);
        assert_eq!(
            view.handle_key(Key::Down).as_deref(),
            Some("A<br />\n<div class=\"indent\">C<br /></div>")
        );
        assert!(view.handle_key(Key::Up).is_some());
        assert_eq!(view.selected(), Some(doc.roots()[0]));
        assert!(view.handle_key(Key::Up).is_none());

        view.handle_key(Key::Left);
        assert_eq!(ids(&view), vec!["r"]);
    }
}
