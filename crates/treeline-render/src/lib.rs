//! # Treeline Render - Outline Document Rendering
//!
//! `treeline-render` turns a stored outline document into display text. A
//! document is a set of typed nodes, a table of node formats, and a list of
//! root nodes. Each format declares typed fields and two kinds of template:
//!
//! - a **title** line, rendered as plain text for tree rows,
//! - **output** lines, rendered as HTML for the detail view of a subtree.
//!
//! ## Core Concepts
//!
//! - [`Document`]: the loaded aggregate of nodes, positions and formats
//! - [`NodeFormat`]: parsed templates plus layout flags for one node type
//! - [`FieldFormat`]: one typed field and its value formatter
//! - [`OutputGroup`]: layout passes turning a subtree into HTML lines
//! - [`OutlineView`]: expand/collapse and selection state over a document
//!
//! ## Quick Start
//!
//! ```rust
//! use treeline_render::{Document, OutputGroup};
//!
//! let doc = Document::from_json(r#"{
//!     "formats": {"Person": {
//!         "titleline": "{*Name*}",
//!         "outputlines": ["{*Name*}: {*Age*}"],
//!         "fields": [
//!             {"fieldname": "Name"},
//!             {"fieldname": "Age", "fieldtype": "Number", "format": "0"}
//!         ]
//!     }},
//!     "nodes": [
//!         {"id": "a", "format": "Person", "data": {"Name": "Root", "Age": "5"},
//!          "children": ["b"]},
//!         {"id": "b", "format": "Person", "data": {"Name": "Child", "Age": "2"}}
//!     ]
//! }"#).unwrap();
//!
//! let root = doc.roots()[0];
//! assert_eq!(doc.title(root), "Root");
//!
//! let lines = OutputGroup::for_subtree(&doc, root).assemble();
//! assert_eq!(lines, vec![
//!     "Root: 5<br />",
//!     "<div class=\"indent\">Child: 2<br /></div>",
//! ]);
//! ```
//!
//! ## Field Placeholders
//!
//! Templates reference fields as `{*Name*}`. Modifiers reach elsewhere in
//! the tree: `{**Name*}` reads the parent, `{*?Name*}` the nearest ancestor
//! defining the field, `{*&Name*}` every child, `{*#Name2*}` counts
//! grandchildren and `{*!File_Name*}` asks the host. See [`template`].
//!
//! ## Errors
//!
//! Only loading can fail, with [`Error`]. Values that fail validation
//! render as [`SENTINEL`]; missing data renders as empty text.

pub mod document;
pub mod error;
pub mod field;
pub mod markup;
pub mod node_format;
pub mod output;
pub mod template;
pub mod values;
pub mod view;

pub use document::{
    build_positions, Document, FileInfo, Node, NodeId, NodeRecord, Position, PositionId,
    Positions, Properties, Snapshot,
};
pub use error::{Error, Result};
pub use field::{FieldDef, FieldFormat, FieldType, MathResult, SENTINEL};
pub use node_format::{FormatDef, FormatTable, Layout, NodeFormat, Segment};
pub use output::{ItemStyle, OutputGroup, OutputItem};
pub use template::{FieldRef, Modifier, Template, Token};
pub use view::{Glyph, Key, OutlineView, Row};
