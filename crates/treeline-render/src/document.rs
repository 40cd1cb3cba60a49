//! The document aggregate: nodes, positions, formats and file information.
//!
//! Nodes and positions live in two arenas addressed by [`NodeId`] and
//! [`PositionId`]. A node is the stored record; a position is one place the
//! node appears in the rendered tree. A node listed as the child of two
//! parents gets two positions that share its data. The first position
//! reuses the node id, the rest get synthesized ids such as `Task_1`.
//!
//! Everything is built once by [`Document::from_snapshot`] and is immutable
//! afterwards.
//!
//! ```rust
//! use treeline_render::Document;
//!
//! let doc = Document::from_json(r#"{
//!     "formats": {"Item": {"titleline": "{*Name*}", "fields": [{"fieldname": "Name"}]}},
//!     "nodes": [{"id": "a", "format": "Item", "data": {"Name": "Groceries"}}]
//! }"#).unwrap();
//! let root = doc.roots()[0];
//! assert_eq!(doc.title(root), "Groceries");
//! ```

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::node_format::{FormatTable, NodeFormat};

/// Index of a node in its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Index of a position in its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionId(pub usize);

/// A serialized document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub formats: FormatTable,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub properties: Properties,
}

/// One stored node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(alias = "uid")]
    pub id: String,
    #[serde(alias = "type")]
    pub format: String,
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Properties {
    #[serde(default)]
    pub topnodes: Vec<String>,
}

/// A loaded node.
#[derive(Debug, Clone)]
pub struct Node {
    id: String,
    type_name: String,
    format: usize,
    data: BTreeMap<String, String>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The raw stored text of a field, or `""` when absent.
    pub fn value(&self, field: &str) -> &str {
        self.data.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn data(&self) -> &BTreeMap<String, String> {
        &self.data
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// One occurrence of a node in the tree.
#[derive(Debug, Clone)]
pub struct Position {
    id: String,
    node: NodeId,
    parent: Option<PositionId>,
    children: Vec<PositionId>,
    depth: usize,
}

impl Position {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn parent(&self) -> Option<PositionId> {
        self.parent
    }

    pub fn children(&self) -> &[PositionId] {
        &self.children
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// The position arena built from a node arena.
#[derive(Debug, Clone, Default)]
pub struct Positions {
    pub positions: Vec<Position>,
    pub by_id: HashMap<String, PositionId>,
    pub roots: Vec<PositionId>,
}

/// Expands the node graph into positions, breadth-first from `roots`.
///
/// A child reference to the node itself or to one of its ancestors is
/// skipped.
pub fn build_positions(nodes: &[Node], roots: &[NodeId]) -> Positions {
    let node_ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let mut clone_counts: HashMap<NodeId, usize> = HashMap::new();
    let mut result = Positions::default();
    let mut queue = VecDeque::new();

    let mut add = |result: &mut Positions,
                   node: NodeId,
                   parent: Option<PositionId>,
                   depth: usize| {
        let base = &nodes[node.0].id;
        let id = if result.by_id.contains_key(base) {
            let counter = clone_counts.entry(node).or_insert(0);
            loop {
                *counter += 1;
                let candidate = format!("{}_{}", base, counter);
                if !result.by_id.contains_key(&candidate)
                    && !node_ids.contains(candidate.as_str())
                {
                    break candidate;
                }
            }
        } else {
            base.clone()
        };
        let pos = PositionId(result.positions.len());
        result.by_id.insert(id.clone(), pos);
        result.positions.push(Position {
            id,
            node,
            parent,
            children: Vec::new(),
            depth,
        });
        if let Some(parent) = parent {
            result.positions[parent.0].children.push(pos);
        }
        pos
    };

    for &root in roots {
        let pos = add(&mut result, root, None, 0);
        result.roots.push(pos);
        queue.push_back(pos);
    }

    while let Some(pos) = queue.pop_front() {
        let node = result.positions[pos.0].node;
        let depth = result.positions[pos.0].depth;
        for &child in &nodes[node.0].children {
            if is_on_path(&result, pos, child) {
                tracing::warn!(
                    parent = %nodes[node.0].id,
                    child = %nodes[child.0].id,
                    "skipping cyclic child reference"
                );
                continue;
            }
            let child_pos = add(&mut result, child, Some(pos), depth + 1);
            queue.push_back(child_pos);
        }
    }
    result
}

/// Whether `node` already appears at `pos` or above it.
fn is_on_path(positions: &Positions, pos: PositionId, node: NodeId) -> bool {
    let mut current = Some(pos);
    while let Some(p) = current {
        let position = &positions.positions[p.0];
        if position.node == node {
            return true;
        }
        current = position.parent;
    }
    false
}

/// Host-supplied values for `{*!Name*}` placeholders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfo {
    values: BTreeMap<String, String>,
}

impl FileInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Describes a document file: `File_Name`, `File_Path` and `File_Size`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path)?;
        let mut info = FileInfo::new();
        if let Some(name) = path.file_name() {
            info.insert("File_Name", name.to_string_lossy());
        }
        let dir = path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        info.insert("File_Path", dir);
        info.insert("File_Size", metadata.len().to_string());
        Ok(info)
    }
}

/// A loaded, render-ready document.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    formats: Vec<NodeFormat>,
    positions: Positions,
    file_info: FileInfo,
}

impl Document {
    pub fn from_json(text: &str) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(text)?;
        Self::from_snapshot(snapshot)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        Self::from_snapshot(snapshot)
    }

    /// Loads a document file and fills in its file information.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let doc = Self::from_reader(BufReader::new(File::open(path)?))?;
        Ok(doc.with_file_info(FileInfo::from_path(path)?))
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        let mut formats = Vec::new();
        let mut format_index = HashMap::new();
        for def in snapshot.formats.into_defs() {
            let format = NodeFormat::from_def(&def)?;
            format_index.insert(format.name().to_string(), formats.len());
            formats.push(format);
        }

        let mut node_index = HashMap::new();
        for (idx, record) in snapshot.nodes.iter().enumerate() {
            if node_index.insert(record.id.clone(), NodeId(idx)).is_some() {
                return Err(Error::DuplicateNode(record.id.clone()));
            }
        }

        let mut nodes = Vec::with_capacity(snapshot.nodes.len());
        for record in snapshot.nodes {
            let format = *format_index
                .get(&record.format)
                .ok_or_else(|| Error::unknown_format(&record.id, &record.format))?;
            let children = record
                .children
                .iter()
                .map(|child| {
                    node_index
                        .get(child)
                        .copied()
                        .ok_or_else(|| Error::unknown_child(&record.id, child))
                })
                .collect::<Result<Vec<_>>>()?;
            let data = record
                .data
                .into_iter()
                .map(|(key, value)| (key, stored_text(value)))
                .collect();
            nodes.push(Node {
                id: record.id,
                type_name: record.format,
                format,
                data,
                children,
            });
        }

        let roots = if snapshot.properties.topnodes.is_empty() {
            let referenced: HashSet<NodeId> =
                nodes.iter().flat_map(|n| n.children.iter().copied()).collect();
            (0..nodes.len())
                .map(NodeId)
                .filter(|id| !referenced.contains(id))
                .collect()
        } else {
            snapshot
                .properties
                .topnodes
                .iter()
                .map(|id| {
                    node_index
                        .get(id)
                        .copied()
                        .ok_or_else(|| Error::UnknownRoot(id.clone()))
                })
                .collect::<Result<Vec<_>>>()?
        };

        let positions = build_positions(&nodes, &roots);
        tracing::debug!(
            formats = formats.len(),
            nodes = nodes.len(),
            positions = positions.positions.len(),
            roots = positions.roots.len(),
            "loaded document"
        );

        Ok(Document {
            nodes,
            formats,
            positions,
            file_info: FileInfo::default(),
        })
    }

    pub fn with_file_info(mut self, file_info: FileInfo) -> Self {
        self.file_info = file_info;
        self
    }

    pub fn file_info(&self) -> &FileInfo {
        &self.file_info
    }

    pub fn roots(&self) -> &[PositionId] {
        &self.positions.roots
    }

    pub fn position(&self, pos: PositionId) -> &Position {
        &self.positions.positions[pos.0]
    }

    pub fn positions(&self) -> impl Iterator<Item = PositionId> + '_ {
        (0..self.positions.positions.len()).map(PositionId)
    }

    pub fn position_count(&self) -> usize {
        self.positions.positions.len()
    }

    /// Looks up a position by its (possibly synthesized) id.
    pub fn find_position(&self, id: &str) -> Option<PositionId> {
        let found = self.positions.by_id.get(id).copied();
        if found.is_none() {
            tracing::debug!(id, "no such position");
        }
        found
    }

    pub fn position_id(&self, pos: PositionId) -> &str {
        &self.position(pos).id
    }

    pub fn parent(&self, pos: PositionId) -> Option<PositionId> {
        self.position(pos).parent
    }

    pub fn children(&self, pos: PositionId) -> &[PositionId] {
        &self.position(pos).children
    }

    pub fn depth(&self, pos: PositionId) -> usize {
        self.position(pos).depth
    }

    pub fn node(&self, pos: PositionId) -> &Node {
        &self.nodes[self.position(pos).node.0]
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn format_of(&self, pos: PositionId) -> &NodeFormat {
        &self.formats[self.node(pos).format]
    }

    pub fn title(&self, pos: PositionId) -> String {
        self.format_of(pos).format_title(self, pos)
    }

    /// Output lines of one position; table layouts keep blank lines.
    pub fn output_lines(&self, pos: PositionId) -> Vec<String> {
        let format = self.format_of(pos);
        format.format_output(self, pos, format.layout().tables)
    }

    /// `pos` and everything below it, depth-first pre-order.
    pub fn descendants(&self, pos: PositionId) -> Vec<PositionId> {
        let mut result = Vec::new();
        let mut stack = vec![pos];
        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        result
    }
}

fn stored_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn load(value: serde_json::Value) -> Result<Document> {
        Document::from_json(&value.to_string())
    }

    fn item_formats() -> serde_json::Value {
        json!({"Item": {"titleline": "{*Name*}", "fields": [{"fieldname": "Name"}]}})
    }

    #[test]
    fn test_clone_positions_get_unique_ids() {
        let doc = load(json!({
            "formats": item_formats(),
            "nodes": [
                {"id": "r", "format": "Item", "children": ["a", "b"]},
                {"id": "a", "format": "Item", "children": ["s"]},
                {"id": "b", "format": "Item", "children": ["s"]},
                {"id": "s", "format": "Item", "data": {"Name": "Shared"}}
            ]
        }))
        .unwrap();

        assert_eq!(doc.position_count(), 5);
        let first = doc.find_position("s").unwrap();
        let second = doc.find_position("s_1").unwrap();
        assert_ne!(first, second);
        assert_eq!(doc.node(first).id(), doc.node(second).id());
        assert_eq!(doc.title(second), "Shared");
        assert_eq!(doc.position_id(doc.parent(second).unwrap()), "b");
    }

    #[test]
    fn test_synthesized_id_skips_existing_node_id() {
        let doc = load(json!({
            "formats": item_formats(),
            "nodes": [
                {"id": "r", "format": "Item", "children": ["s", "s", "s_1"]},
                {"id": "s", "format": "Item"},
                {"id": "s_1", "format": "Item"}
            ]
        }))
        .unwrap();
        assert!(doc.find_position("s_2").is_some());
        assert_eq!(doc.node(doc.find_position("s_1").unwrap()).id(), "s_1");
    }

    #[test]
    fn test_breadth_first_order() {
        let doc = load(json!({
            "formats": item_formats(),
            "nodes": [
                {"id": "r", "format": "Item", "children": ["a", "b"]},
                {"id": "a", "format": "Item", "children": ["c"]},
                {"id": "b", "format": "Item"},
                {"id": "c", "format": "Item"}
            ]
        }))
        .unwrap();
        let ids: Vec<&str> = doc.positions().map(|p| doc.position_id(p)).collect();
        assert_eq!(ids, vec!["r", "a", "b", "c"]);
        let pre: Vec<&str> = doc
            .descendants(doc.roots()[0])
            .into_iter()
            .map(|p| doc.position_id(p))
            .collect();
        assert_eq!(pre, vec!["r", "a", "c", "b"]);
    }

    #[test]
    fn test_cycle_is_skipped() {
        let doc = load(json!({
            "formats": item_formats(),
            "nodes": [
                {"id": "a", "format": "Item", "children": ["b"]},
                {"id": "b", "format": "Item", "children": ["a", "b"]}
            ],
            "properties": {"topnodes": ["a"]}
        }))
        .unwrap();
        assert_eq!(doc.position_count(), 2);
    }

    #[test]
    fn test_roots_default_to_unreferenced_nodes() {
        let doc = load(json!({
            "formats": item_formats(),
            "nodes": [
                {"id": "x", "format": "Item", "children": ["y"]},
                {"id": "y", "format": "Item"},
                {"id": "z", "format": "Item"}
            ]
        }))
        .unwrap();
        let roots: Vec<&str> = doc.roots().iter().map(|&p| doc.position_id(p)).collect();
        assert_eq!(roots, vec!["x", "z"]);
    }

    #[test]
    fn test_load_errors() {
        let err = load(json!({
            "formats": item_formats(),
            "nodes": [{"id": "a", "format": "Item", "children": ["ghost"]}]
        }))
        .unwrap_err();
        assert!(matches!(err, Error::UnknownChild { .. }));

        let err = load(json!({
            "formats": item_formats(),
            "nodes": [{"id": "a", "format": "Nope"}]
        }))
        .unwrap_err();
        assert!(matches!(err, Error::UnknownFormat { .. }));

        let err = load(json!({
            "formats": item_formats(),
            "nodes": [{"id": "a", "format": "Item"}, {"id": "a", "format": "Item"}]
        }))
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateNode(_)));

        let err = load(json!({
            "formats": item_formats(),
            "nodes": [{"id": "a", "format": "Item"}],
            "properties": {"topnodes": ["b"]}
        }))
        .unwrap_err();
        assert!(matches!(err, Error::UnknownRoot(_)));
    }

    #[test]
    fn test_unknown_field_type_fails_load() {
        let err = load(json!({
            "formats": {"Item": {"fields": [{"fieldname": "X", "fieldtype": "Hologram"}]}},
            "nodes": []
        }))
        .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_non_string_data_is_stringified() {
        let doc = load(json!({
            "formats": item_formats(),
            "nodes": [{"uid": "a", "type": "Item", "data": {"Name": 42, "Gone": null}}]
        }))
        .unwrap();
        let node = doc.node(doc.roots()[0]);
        assert_eq!(node.value("Name"), "42");
        assert_eq!(node.value("Gone"), "");
        assert_eq!(node.value("Absent"), "");
    }

    #[test]
    fn test_file_info_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(&path, "{}").unwrap();

        let info = FileInfo::from_path(&path).unwrap();
        assert_eq!(info.get("File_Name"), Some("plan.json"));
        assert_eq!(info.get("File_Size"), Some("2"));
        assert_eq!(
            info.get("File_Path"),
            Some(dir.path().to_string_lossy().as_ref())
        );
    }
}
