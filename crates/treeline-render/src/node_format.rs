//! Node formats: the per-type title and output templates.
//!
//! A [`NodeFormat`] is loaded once from a [`FormatDef`]. Loading compiles
//! every field, parses the title and output templates, and binds each
//! placeholder to the field it names. Plain placeholders naming a field the
//! format does not declare are turned back into literal text at this point,
//! so rendering never has to look anything up by name.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::document::{Document, PositionId};
use crate::error::Result;
use crate::field::{FieldDef, FieldFormat, FieldType};
use crate::markup;
use crate::template::{FieldRef, Modifier, Template, Token};

fn default_separator() -> String {
    ", ".to_string()
}

/// A node format as declared in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatDef {
    #[serde(alias = "formatname", default)]
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    #[serde(alias = "titleline", default)]
    pub title: String,
    #[serde(alias = "outputlines", default)]
    pub output: Vec<String>,
    #[serde(alias = "spacebetween", default)]
    pub space_between: bool,
    #[serde(alias = "formathtml", default)]
    pub format_html: bool,
    #[serde(default)]
    pub bullets: bool,
    #[serde(default)]
    pub tables: bool,
    #[serde(alias = "outputsep", default = "default_separator")]
    pub output_separator: String,
}

impl FormatDef {
    pub fn new(name: impl Into<String>) -> Self {
        FormatDef {
            name: name.into(),
            fields: Vec::new(),
            title: String::new(),
            output: Vec::new(),
            space_between: false,
            format_html: false,
            bullets: false,
            tables: false,
            output_separator: default_separator(),
        }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn output_line(mut self, line: impl Into<String>) -> Self {
        self.output.push(line.into());
        self
    }

    pub fn space_between(mut self, on: bool) -> Self {
        self.space_between = on;
        self
    }

    pub fn format_html(mut self, on: bool) -> Self {
        self.format_html = on;
        self
    }

    pub fn bullets(mut self, on: bool) -> Self {
        self.bullets = on;
        self
    }

    pub fn tables(mut self, on: bool) -> Self {
        self.tables = on;
        self
    }

    pub fn output_separator(mut self, separator: impl Into<String>) -> Self {
        self.output_separator = separator.into();
        self
    }
}

/// The format table of a document, keyed by name or listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormatTable {
    Map(BTreeMap<String, FormatDef>),
    List(Vec<FormatDef>),
}

impl Default for FormatTable {
    fn default() -> Self {
        FormatTable::List(Vec::new())
    }
}

impl FormatTable {
    /// Flattens the table, taking each format's name from its key when the
    /// definition itself leaves it empty.
    pub fn into_defs(self) -> Vec<FormatDef> {
        match self {
            FormatTable::List(defs) => defs,
            FormatTable::Map(map) => map
                .into_iter()
                .map(|(key, mut def)| {
                    if def.name.is_empty() {
                        def.name = key;
                    }
                    def
                })
                .collect(),
        }
    }
}

/// Layout flags of a node format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub space_between: bool,
    pub format_html: bool,
    pub bullets: bool,
    pub tables: bool,
    pub output_separator: String,
}

impl Layout {
    /// The strings opening and closing a run of sibling items.
    pub fn sibling_wrappers(&self) -> (&'static str, &'static str) {
        if self.tables {
            ("<table>", "</table>")
        } else if self.bullets {
            ("<ul>", "</ul>")
        } else {
            ("", "")
        }
    }
}

/// A template piece with its field already resolved.
#[derive(Debug, Clone)]
pub enum Segment {
    Text(String),
    Field(FieldFormat),
}

/// A loaded node format.
#[derive(Debug, Clone)]
pub struct NodeFormat {
    name: String,
    fields: Vec<FieldFormat>,
    field_index: HashMap<String, usize>,
    title: Vec<Segment>,
    output: Vec<Vec<Segment>>,
    layout: Layout,
    sibling_prefix: String,
    sibling_suffix: String,
}

impl NodeFormat {
    pub fn from_def(def: &FormatDef) -> Result<Self> {
        let mut fields = Vec::with_capacity(def.fields.len());
        let mut field_index = HashMap::new();
        for field_def in &def.fields {
            let field = FieldFormat::from_def(&def.name, field_def)?;
            // later declarations of the same name shadow earlier ones
            field_index.insert(field.name().to_string(), fields.len());
            fields.push(field);
        }

        let layout = Layout {
            space_between: def.space_between,
            format_html: def.format_html,
            bullets: def.bullets,
            tables: def.tables,
            output_separator: def.output_separator.clone(),
        };
        let (prefix, suffix) = layout.sibling_wrappers();

        let mut format = NodeFormat {
            name: def.name.clone(),
            fields,
            field_index,
            title: Vec::new(),
            output: Vec::new(),
            sibling_prefix: prefix.to_string(),
            sibling_suffix: suffix.to_string(),
            layout,
        };
        format.title = format.bind(&Template::parse(&def.title));
        format.output = def
            .output
            .iter()
            .map(|line| format.bind(&Template::parse(line)))
            .collect();

        tracing::trace!(
            format = %format.name,
            fields = format.fields.len(),
            lines = format.output.len(),
            "loaded node format"
        );
        Ok(format)
    }

    fn bind(&self, template: &Template) -> Vec<Segment> {
        let mut segments: Vec<Segment> = Vec::new();
        for token in template.tokens() {
            let segment = match token {
                Token::Literal(text) => Segment::Text(text.clone()),
                Token::Field(field_ref) => self.bind_field(field_ref),
            };
            if let (Segment::Text(text), Some(Segment::Text(last))) =
                (&segment, segments.last_mut())
            {
                last.push_str(text);
                continue;
            }
            segments.push(segment);
        }
        segments
    }

    fn bind_field(&self, field_ref: &FieldRef) -> Segment {
        let name = field_ref.name.clone();
        let field = match field_ref.modifier {
            Modifier::Plain => match self.field(&name) {
                Some(field) => field.clone(),
                None => return Segment::Text(field_ref.placeholder()),
            },
            Modifier::Ancestor(level) => {
                FieldFormat::reference(name, FieldType::AncestorLevel, level)
            }
            Modifier::AnyAncestor => FieldFormat::reference(name, FieldType::AnyAncestor, 0),
            Modifier::ChildList => FieldFormat::reference(name, FieldType::ChildList, 0),
            Modifier::DescendantCount(level) => {
                FieldFormat::reference(name, FieldType::DescendantCount, level)
            }
            Modifier::FileInfo => FieldFormat::reference(name, FieldType::StaticFileInfo, 0),
        };
        Segment::Field(field)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&FieldFormat> {
        self.field_index.get(name).map(|&idx| &self.fields[idx])
    }

    pub fn fields(&self) -> &[FieldFormat] {
        &self.fields
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn output_separator(&self) -> &str {
        &self.layout.output_separator
    }

    pub fn sibling_prefix(&self) -> &str {
        &self.sibling_prefix
    }

    pub fn sibling_suffix(&self) -> &str {
        &self.sibling_suffix
    }

    pub fn has_output(&self) -> bool {
        !self.output.is_empty()
    }

    /// The plain-text title of the node at `pos`.
    pub fn format_title(&self, doc: &Document, pos: PositionId) -> String {
        let (text, _) = self.render(&self.title, doc, pos, true);
        text
    }

    /// The HTML output lines of the node at `pos`.
    ///
    /// A line that contains fields, all of which rendered empty, is dropped
    /// unless `keep_blanks` is set.
    pub fn format_output(&self, doc: &Document, pos: PositionId, keep_blanks: bool) -> Vec<String> {
        self.output
            .iter()
            .filter_map(|line| {
                let (text, blank) = self.render(line, doc, pos, false);
                if blank && !keep_blanks {
                    None
                } else {
                    Some(text)
                }
            })
            .collect()
    }

    /// Renders one bound line, reporting whether it had fields and all of
    /// them were empty.
    fn render(
        &self,
        segments: &[Segment],
        doc: &Document,
        pos: PositionId,
        title_mode: bool,
    ) -> (String, bool) {
        let allow_html = self.layout.format_html;
        let mut text = String::new();
        let mut saw_field = false;
        let mut all_empty = true;

        for segment in segments {
            match segment {
                Segment::Text(literal) => text.push_str(&self.literal(literal, title_mode)),
                Segment::Field(field) => {
                    saw_field = true;
                    let value = field.format(doc, pos, title_mode, allow_html);
                    if !value.is_empty() {
                        all_empty = false;
                    }
                    text.push_str(&value);
                }
            }
        }
        (text, saw_field && all_empty)
    }

    fn literal(&self, text: &str, title_mode: bool) -> String {
        match (title_mode, self.layout.format_html) {
            (true, true) => markup::strip_markup(text),
            (true, false) | (false, true) => text.to_string(),
            (false, false) => markup::escape_html(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NodeFormat {
        let def = FormatDef::new("Person")
            .field(FieldDef::new("Name", FieldType::PlainText))
            .field(FieldDef::new("Age", FieldType::Number).with_format("0"))
            .title("{*Name*}")
            .output_line("{*Name*}: {*Age*}")
            .output_line("{*Missing*} & {**Name*}");
        NodeFormat::from_def(&def).unwrap()
    }

    #[test]
    fn test_format_def_keys() {
        let def: FormatDef = serde_json::from_str(
            r#"{
                "formatname": "Task",
                "titleline": "{*Name*}",
                "outputlines": ["{*Name*}"],
                "spacebetween": true,
                "bullets": true,
                "fields": [{"fieldname": "Name", "fieldtype": "Text"}]
            }"#,
        )
        .unwrap();
        assert_eq!(def.name, "Task");
        assert!(def.space_between);
        assert!(def.bullets);
        assert!(!def.tables);
        assert_eq!(def.output_separator, ", ");
        assert_eq!(def.fields.len(), 1);
    }

    #[test]
    fn test_format_table_map_names() {
        let table: FormatTable =
            serde_json::from_str(r#"{"Task": {"titleline": "x"}}"#).unwrap();
        let defs = table.into_defs();
        assert_eq!(defs[0].name, "Task");

        let table: FormatTable =
            serde_json::from_str(r#"[{"formatname": "Note"}]"#).unwrap();
        assert_eq!(table.into_defs()[0].name, "Note");
    }

    #[test]
    fn test_sibling_wrappers() {
        let plain = NodeFormat::from_def(&FormatDef::new("A")).unwrap();
        assert_eq!(plain.sibling_prefix(), "");

        let bullets = NodeFormat::from_def(&FormatDef::new("B").bullets(true)).unwrap();
        assert_eq!(bullets.sibling_prefix(), "<ul>");
        assert_eq!(bullets.sibling_suffix(), "</ul>");

        let both = NodeFormat::from_def(&FormatDef::new("C").bullets(true).tables(true)).unwrap();
        assert_eq!(both.sibling_prefix(), "<table>");
        assert_eq!(both.sibling_suffix(), "</table>");
    }

    #[test]
    fn test_unknown_plain_field_becomes_literal() {
        let format = sample();
        match &format.output[1][..] {
            [Segment::Text(text), Segment::Field(field)] => {
                assert_eq!(text, "{*Missing*} & ");
                assert_eq!(field.field_type(), FieldType::AncestorLevel);
                assert_eq!(field.depth(), 1);
            }
            other => panic!("unexpected segments {:?}", other),
        }
    }

    #[test]
    fn test_literal_escaping_policy() {
        let format = sample();
        assert_eq!(format.literal("a & <b>", false), "a &amp; &lt;b&gt;");
        assert_eq!(format.literal("a & <b>", true), "a & <b>");

        let html = NodeFormat::from_def(&FormatDef::new("H").format_html(true)).unwrap();
        assert_eq!(html.literal("<b>x</b>", false), "<b>x</b>");
        assert_eq!(html.literal("<b>x</b>", true), "x");
    }

    #[test]
    fn test_shadowed_field_uses_last_definition() {
        let def = FormatDef::new("T")
            .field(FieldDef::new("X", FieldType::PlainText))
            .field(FieldDef::new("X", FieldType::Number));
        let format = NodeFormat::from_def(&def).unwrap();
        assert_eq!(format.field("X").unwrap().field_type(), FieldType::Number);
    }
}
