//! Field definitions and value dispatch.
//!
//! A [`FieldFormat`] describes one named field of a node format: its
//! [`FieldType`], a type-specific pattern, and the prefix and suffix wrapped
//! around non-empty output. [`FieldFormat::format`] turns the field's value
//! at a tree position into display text.
//!
//! # Rendering Modes
//!
//! - **Title mode** produces plain text: markup is stripped from the value.
//! - **Output mode** produces HTML-safe text: unless the node format allows
//!   HTML, `&`, `<` and `>` are escaped in the value, prefix and suffix.
//!
//! Values that fail type validation (a choice not in the list, an
//! unparseable number, a failed regular expression) render as
//! [`SENTINEL`]. Empty stored values render as nothing at all, without
//! prefix or suffix, so that lines made only of empty fields can be
//! dropped.
//!
//! # Reference Fields
//!
//! The pseudo types [`FieldType::AncestorLevel`], [`FieldType::AnyAncestor`],
//! [`FieldType::ChildList`], [`FieldType::DescendantCount`] and
//! [`FieldType::StaticFileInfo`] are never declared in a document. They are
//! created from placeholder modifiers and compute their value by walking the
//! tree or asking the host.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::document::{Document, PositionId};
use crate::error::{Error, Result};
use crate::markup::{self, split_escaped};
use crate::values::{self, NumberingGroup};

/// Marker rendered in place of a value that fails validation.
pub const SENTINEL: &str = "#####";

const BOOLEAN_WORDS: [(&str, usize); 8] = [
    ("true", 0),
    ("false", 1),
    ("t", 0),
    ("f", 1),
    ("yes", 0),
    ("no", 1),
    ("y", 0),
    ("n", 1),
];

/// The closed set of field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FieldType {
    #[default]
    #[serde(alias = "Text")]
    PlainText,
    HtmlText,
    OneLineText,
    SpacedText,
    Number,
    Math,
    Numbering,
    Date,
    Time,
    DateTime,
    Choice,
    AutoChoice,
    Combination,
    AutoCombination,
    Boolean,
    ExternalLink,
    InternalLink,
    Picture,
    RegularExpression,
    #[serde(skip_deserializing)]
    AncestorLevel,
    #[serde(skip_deserializing)]
    AnyAncestor,
    #[serde(skip_deserializing)]
    ChildList,
    #[serde(skip_deserializing)]
    DescendantCount,
    #[serde(skip_deserializing)]
    StaticFileInfo,
}

impl FieldType {
    /// Types whose value is computed from the tree or host instead of read
    /// from node data.
    pub fn is_placeholder(self) -> bool {
        matches!(
            self,
            FieldType::AncestorLevel
                | FieldType::AnyAncestor
                | FieldType::ChildList
                | FieldType::DescendantCount
                | FieldType::StaticFileInfo
        )
    }

    /// Types whose stored value is markup and is never escaped.
    pub fn is_markup(self) -> bool {
        matches!(
            self,
            FieldType::HtmlText
                | FieldType::ExternalLink
                | FieldType::InternalLink
                | FieldType::Picture
        )
    }

    /// Pattern used when a field of this type declares none.
    pub fn default_pattern(self) -> &'static str {
        match self {
            FieldType::Number => "#.##",
            FieldType::Date => "%B %-d, %Y",
            FieldType::Time => "%-I:%M:%S %p",
            FieldType::DateTime => "%B %-d, %Y %-I:%M:%S %p",
            FieldType::Numbering => "1..",
            FieldType::Boolean => "yes/no",
            _ => "",
        }
    }
}

/// What kind of value a math field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MathResult {
    #[default]
    #[serde(alias = "numeric")]
    Number,
    Date,
    Time,
    Boolean,
    Text,
}

/// A field as declared in a document's format table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    #[serde(alias = "fieldname")]
    pub name: String,
    #[serde(rename = "fieldtype", alias = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
    #[serde(rename = "resulttype", default)]
    pub result_type: MathResult,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        FieldDef {
            name: name.into(),
            field_type,
            format: String::new(),
            prefix: String::new(),
            suffix: String::new(),
            result_type: MathResult::default(),
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_result_type(mut self, result_type: MathResult) -> Self {
        self.result_type = result_type;
        self
    }
}

/// Pattern state compiled once at load time.
#[derive(Debug, Clone)]
enum Compiled {
    None,
    Choices(Vec<String>),
    Boolean(Vec<String>),
    Numbering(NumberingGroup),
    Regex(Regex),
}

/// A loaded, ready-to-render field.
#[derive(Debug, Clone)]
pub struct FieldFormat {
    name: String,
    field_type: FieldType,
    pattern: String,
    prefix: String,
    suffix: String,
    depth: usize,
    placeholder: bool,
    result_type: MathResult,
    compiled: Compiled,
}

impl FieldFormat {
    /// Loads a declared field, compiling its pattern.
    ///
    /// `format_name` is only used for error reporting.
    pub fn from_def(format_name: &str, def: &FieldDef) -> Result<Self> {
        let pattern = if def.format.is_empty() {
            def.field_type.default_pattern().to_string()
        } else {
            def.format.clone()
        };

        let compiled = match def.field_type {
            FieldType::Choice | FieldType::Combination => Compiled::Choices(
                split_escaped(&pattern, '/')
                    .into_iter()
                    .filter(|c| !c.is_empty())
                    .collect(),
            ),
            FieldType::Boolean => Compiled::Boolean(split_escaped(&pattern, '/')),
            FieldType::Math if def.result_type == MathResult::Boolean => {
                Compiled::Boolean(split_escaped(&pattern_or(&pattern, "yes/no"), '/'))
            }
            FieldType::Numbering => Compiled::Numbering(NumberingGroup::compile(&pattern)),
            FieldType::RegularExpression => {
                let anchored = format!("^(?:{})$", pattern);
                let regex = Regex::new(&anchored).map_err(|source| Error::InvalidPattern {
                    format: format_name.to_string(),
                    field: def.name.clone(),
                    source,
                })?;
                Compiled::Regex(regex)
            }
            _ => Compiled::None,
        };

        Ok(FieldFormat {
            name: def.name.clone(),
            field_type: def.field_type,
            pattern,
            prefix: def.prefix.clone(),
            suffix: def.suffix.clone(),
            depth: 0,
            placeholder: def.field_type.is_placeholder(),
            result_type: def.result_type,
            compiled,
        })
    }

    /// Creates a reference pseudo-field for a placeholder modifier.
    ///
    /// `depth` is the ancestor level for [`FieldType::AncestorLevel`] and
    /// the descendant level for [`FieldType::DescendantCount`].
    pub fn reference(name: impl Into<String>, field_type: FieldType, depth: usize) -> Self {
        FieldFormat {
            name: name.into(),
            field_type,
            pattern: String::new(),
            prefix: String::new(),
            suffix: String::new(),
            depth,
            placeholder: true,
            result_type: MathResult::default(),
            compiled: Compiled::None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    /// Renders this field for the node at `pos`.
    pub fn format(
        &self,
        doc: &Document,
        pos: PositionId,
        title_mode: bool,
        allow_html: bool,
    ) -> String {
        let stored = doc.node(pos).value(&self.name);
        if stored.is_empty() && !self.placeholder {
            return String::new();
        }

        let value = match self.field_type {
            FieldType::AncestorLevel => {
                return self.ancestor_output(doc, pos, title_mode, allow_html)
            }
            FieldType::AnyAncestor => {
                return self.any_ancestor_output(doc, pos, title_mode, allow_html)
            }
            FieldType::ChildList => {
                return self.child_list_output(doc, pos, title_mode, allow_html)
            }
            FieldType::DescendantCount => Some(self.descendant_count(doc, pos).to_string()),
            FieldType::StaticFileInfo => {
                Some(doc.file_info().get(&self.name).unwrap_or("").to_string())
            }
            FieldType::PlainText
            | FieldType::HtmlText
            | FieldType::SpacedText
            | FieldType::AutoChoice => Some(stored.to_string()),
            FieldType::OneLineText => Some(markup::first_line(stored).to_string()),
            FieldType::Number => {
                parse_number(stored).map(|n| values::format_number(n, &self.pattern))
            }
            FieldType::Math => self.math_value(stored),
            FieldType::Numbering => match &self.compiled {
                Compiled::Numbering(group) => group.format(stored),
                _ => None,
            },
            FieldType::Date => values::format_date(stored, &self.pattern),
            FieldType::Time => values::format_time(stored, &self.pattern),
            FieldType::DateTime => values::format_datetime(stored, &self.pattern),
            FieldType::Choice => self.choice_value(stored),
            FieldType::Combination => {
                self.combination_value(stored, doc.format_of(pos).output_separator())
            }
            FieldType::AutoCombination => Some(
                split_escaped(stored, '/')
                    .into_iter()
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(doc.format_of(pos).output_separator()),
            ),
            FieldType::Boolean => self.boolean_value(stored),
            FieldType::ExternalLink | FieldType::InternalLink => {
                if title_mode {
                    Some(self.link_title(stored))
                } else {
                    Some(stored.to_string())
                }
            }
            FieldType::Picture => {
                if title_mode {
                    Some(markup::image_source(stored).unwrap_or_default())
                } else {
                    Some(stored.to_string())
                }
            }
            FieldType::RegularExpression => match &self.compiled {
                Compiled::Regex(regex) if regex.is_match(&markup::unescape_html(stored)) => {
                    Some(stored.to_string())
                }
                _ => None,
            },
        };

        let value = value.unwrap_or_else(|| SENTINEL.to_string());
        self.decorate(value, title_mode, allow_html)
    }

    /// Applies markup policy and wraps a non-empty value in prefix/suffix.
    fn decorate(&self, value: String, title_mode: bool, allow_html: bool) -> String {
        if value.is_empty() {
            return String::new();
        }

        if title_mode {
            let value = markup::strip_markup(&value);
            if allow_html {
                return format!(
                    "{}{}{}",
                    markup::strip_markup(&self.prefix),
                    value,
                    markup::strip_markup(&self.suffix)
                );
            }
            return format!("{}{}{}", self.prefix, value, self.suffix);
        }

        let mut value = if allow_html || self.field_type.is_markup() {
            value
        } else {
            markup::escape_html(&value)
        };
        match self.field_type {
            FieldType::PlainText => {
                if value.contains('\n') {
                    value = value.replace("\r\n", "\n").replace('\n', "<br />");
                }
            }
            FieldType::SpacedText => value = format!("<pre>{}</pre>", value),
            _ => {}
        }

        if allow_html {
            format!("{}{}{}", self.prefix, value, self.suffix)
        } else {
            format!(
                "{}{}{}",
                markup::escape_html(&self.prefix),
                value,
                markup::escape_html(&self.suffix)
            )
        }
    }

    fn math_value(&self, stored: &str) -> Option<String> {
        match self.result_type {
            MathResult::Number => {
                let pattern = pattern_or(&self.pattern, FieldType::Number.default_pattern());
                parse_number(stored).map(|n| values::format_number(n, &pattern))
            }
            MathResult::Date => values::format_date(
                stored,
                &pattern_or(&self.pattern, FieldType::Date.default_pattern()),
            ),
            MathResult::Time => values::format_time(
                stored,
                &pattern_or(&self.pattern, FieldType::Time.default_pattern()),
            ),
            MathResult::Boolean => self.boolean_value(stored),
            MathResult::Text => Some(stored.to_string()),
        }
    }

    fn choice_value(&self, stored: &str) -> Option<String> {
        match &self.compiled {
            Compiled::Choices(choices) if choices.iter().any(|c| c == stored) => {
                Some(stored.to_string())
            }
            _ => None,
        }
    }

    fn combination_value(&self, stored: &str, separator: &str) -> Option<String> {
        let Compiled::Choices(choices) = &self.compiled else {
            return None;
        };
        let selected: Vec<String> = split_escaped(stored, '/')
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        if selected.iter().any(|s| !choices.contains(s)) {
            return None;
        }
        Some(
            choices
                .iter()
                .filter(|c| selected.contains(c))
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(separator),
        )
    }

    fn boolean_value(&self, stored: &str) -> Option<String> {
        let Compiled::Boolean(words) = &self.compiled else {
            return None;
        };
        let key = stored.trim().to_lowercase();
        let idx = BOOLEAN_WORDS
            .iter()
            .find(|(word, _)| *word == key)
            .map(|(_, idx)| *idx)?;
        Some(words.get(idx).cloned().unwrap_or_default())
    }

    fn link_title(&self, stored: &str) -> String {
        match markup::anchor_parts(stored) {
            Some((text, _)) if !text.is_empty() => text,
            Some((_, href)) => {
                if self.field_type == FieldType::InternalLink {
                    href.trim_start_matches('#').to_string()
                } else {
                    href
                }
            }
            None => stored.to_string(),
        }
    }

    fn ancestor_output(
        &self,
        doc: &Document,
        pos: PositionId,
        title_mode: bool,
        allow_html: bool,
    ) -> String {
        let mut current = pos;
        for _ in 0..self.depth {
            match doc.parent(current) {
                Some(parent) => current = parent,
                None => return String::new(),
            }
        }
        match doc.format_of(current).field(&self.name) {
            Some(field) => field.format(doc, current, title_mode, allow_html),
            None => String::new(),
        }
    }

    fn any_ancestor_output(
        &self,
        doc: &Document,
        pos: PositionId,
        title_mode: bool,
        allow_html: bool,
    ) -> String {
        let mut current = pos;
        while let Some(parent) = doc.parent(current) {
            if let Some(field) = doc.format_of(parent).field(&self.name) {
                return field.format(doc, parent, title_mode, allow_html);
            }
            current = parent;
        }
        String::new()
    }

    fn child_list_output(
        &self,
        doc: &Document,
        pos: PositionId,
        title_mode: bool,
        allow_html: bool,
    ) -> String {
        doc.children(pos)
            .iter()
            .filter_map(|&child| {
                doc.format_of(child)
                    .field(&self.name)
                    .map(|field| field.format(doc, child, title_mode, allow_html))
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(doc.format_of(pos).output_separator())
    }

    fn descendant_count(&self, doc: &Document, pos: PositionId) -> usize {
        if self.depth == 0 {
            return 0;
        }
        let mut level = vec![pos];
        for _ in 0..self.depth {
            level = level
                .iter()
                .flat_map(|&p| doc.children(p).iter().copied())
                .collect();
        }
        level.len()
    }
}

fn parse_number(stored: &str) -> Option<f64> {
    stored.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn pattern_or(pattern: &str, default: &str) -> String {
    if pattern.is_empty() {
        default.to_string()
    } else {
        pattern.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_names() {
        let parsed: FieldType = serde_json::from_str("\"Text\"").unwrap();
        assert_eq!(parsed, FieldType::PlainText);
        let parsed: FieldType = serde_json::from_str("\"RegularExpression\"").unwrap();
        assert_eq!(parsed, FieldType::RegularExpression);
    }

    #[test]
    fn test_unknown_and_pseudo_types_rejected() {
        assert!(serde_json::from_str::<FieldType>("\"Sparkline\"").is_err());
        assert!(serde_json::from_str::<FieldType>("\"ChildList\"").is_err());
    }

    #[test]
    fn test_field_def_keys() {
        let def: FieldDef = serde_json::from_str(
            r#"{"fieldname": "Cost", "fieldtype": "Number", "format": "0.00", "prefix": "$"}"#,
        )
        .unwrap();
        assert_eq!(def.name, "Cost");
        assert_eq!(def.field_type, FieldType::Number);
        assert_eq!(def.prefix, "$");
        assert_eq!(def.result_type, MathResult::Number);
    }

    #[test]
    fn test_default_patterns_applied() {
        let field = FieldFormat::from_def("T", &FieldDef::new("D", FieldType::Date)).unwrap();
        assert_eq!(field.pattern(), "%B %-d, %Y");
        let field = FieldFormat::from_def("T", &FieldDef::new("X", FieldType::PlainText)).unwrap();
        assert_eq!(field.pattern(), "");
    }

    #[test]
    fn test_invalid_regex_fails_at_load() {
        let def = FieldDef::new("Code", FieldType::RegularExpression).with_format("[a-");
        let err = FieldFormat::from_def("Part", &def).unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn test_reference_fields_are_placeholders() {
        let field = FieldFormat::reference("Name", FieldType::AncestorLevel, 2);
        assert!(field.is_placeholder());
        assert_eq!(field.depth(), 2);
        assert!(!FieldType::Number.is_placeholder());
    }

    #[test]
    fn test_decorate_escapes_in_output_mode() {
        let def = FieldDef::new("N", FieldType::PlainText)
            .with_prefix("<")
            .with_suffix(">");
        let field = FieldFormat::from_def("T", &def).unwrap();
        assert_eq!(
            field.decorate("a & b".to_string(), false, false),
            "&lt;a &amp; b&gt;"
        );
        assert_eq!(field.decorate("a & b".to_string(), false, true), "<a & b>");
    }

    #[test]
    fn test_decorate_title_mode_strips_markup() {
        let def = FieldDef::new("N", FieldType::PlainText)
            .with_prefix("<b>")
            .with_suffix("</b>");
        let field = FieldFormat::from_def("T", &def).unwrap();
        assert_eq!(
            field.decorate("<i>x</i>".to_string(), true, false),
            "<b>x</b>"
        );
        assert_eq!(field.decorate("<i>x</i>".to_string(), true, true), "x");
    }

    #[test]
    fn test_decorate_empty_value_drops_affixes() {
        let def = FieldDef::new("N", FieldType::PlainText).with_prefix("(");
        let field = FieldFormat::from_def("T", &def).unwrap();
        assert_eq!(field.decorate(String::new(), false, false), "");
    }

    #[test]
    fn test_decorate_text_layout() {
        let field = FieldFormat::from_def("T", &FieldDef::new("N", FieldType::PlainText)).unwrap();
        assert_eq!(field.decorate("a\nb".to_string(), false, false), "a<br />b");

        let field = FieldFormat::from_def("T", &FieldDef::new("N", FieldType::SpacedText)).unwrap();
        assert_eq!(
            field.decorate("a  <b".to_string(), false, false),
            "<pre>a  &lt;b</pre>"
        );
    }

    #[test]
    fn test_boolean_lookup() {
        let def = FieldDef::new("Done", FieldType::Boolean).with_format("done/open");
        let field = FieldFormat::from_def("T", &def).unwrap();
        assert_eq!(field.boolean_value("YES").as_deref(), Some("done"));
        assert_eq!(field.boolean_value("f").as_deref(), Some("open"));
        assert_eq!(field.boolean_value("maybe"), None);
    }

    #[test]
    fn test_combination_reorders() {
        let def = FieldDef::new("Tags", FieldType::Combination).with_format("red/green/blue");
        let field = FieldFormat::from_def("T", &def).unwrap();
        assert_eq!(
            field.combination_value("blue/red", ", ").as_deref(),
            Some("red, blue")
        );
        assert_eq!(field.combination_value("blue/pink", ", "), None);
    }

    #[test]
    fn test_link_title() {
        let field =
            FieldFormat::from_def("T", &FieldDef::new("L", FieldType::InternalLink)).unwrap();
        assert_eq!(field.link_title(r##"<a href="#node3"></a>"##), "node3");
        assert_eq!(field.link_title(r##"<a href="#node3">Three</a>"##), "Three");

        let field =
            FieldFormat::from_def("T", &FieldDef::new("L", FieldType::ExternalLink)).unwrap();
        assert_eq!(
            field.link_title(r#"<a href="https://example.org"></a>"#),
            "https://example.org"
        );
    }

    #[test]
    fn test_parse_number_rejects_non_finite() {
        assert_eq!(parse_number(" 2.5 "), Some(2.5));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("abc"), None);
    }
}
