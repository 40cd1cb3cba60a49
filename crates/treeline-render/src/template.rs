//! Format-string parsing.
//!
//! Title and output lines are written as plain text with embedded field
//! placeholders. This module turns such a string into a [`Template`], an
//! immutable list of [`Token`]s. Templates are parsed once, when a format is
//! loaded, and rendered many times.
//!
//! # Syntax
//!
//! | Placeholder | Meaning |
//! |-------------|---------|
//! | `{*Name*}` | Field `Name` of the current node |
//! | `{**Name*}` | Field `Name` of the parent (one more `*` per level up) |
//! | `{*?Name*}` | Field `Name` of the nearest ancestor that defines it |
//! | `{*&Name*}` | Field `Name` of every child, joined |
//! | `{*#Name2*}` | Number of descendants two levels down |
//! | `{*!File_Name*}` | File information supplied by the host |
//!
//! Anything that does not form a valid placeholder is kept as literal
//! text, including descendant counts whose level is missing or zero.
//!
//! ```rust
//! use treeline_render::template::{Modifier, Template, Token};
//!
//! let template = Template::parse("{*Name*} ({**Name*})");
//! let tokens = template.tokens();
//! assert_eq!(tokens.len(), 4);
//! assert!(matches!(&tokens[2], Token::Field(f) if f.modifier == Modifier::Ancestor(1)));
//! ```

/// How a placeholder locates its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    /// A field of the current node.
    Plain,
    /// A field of the ancestor this many levels up.
    Ancestor(usize),
    /// A field of the closest ancestor whose format defines it.
    AnyAncestor,
    /// A field of each direct child.
    ChildList,
    /// The number of descendants this many levels down.
    DescendantCount(usize),
    /// A host-supplied file information value.
    FileInfo,
}

/// A field placeholder found in a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub name: String,
    pub modifier: Modifier,
}

impl FieldRef {
    pub fn new(name: impl Into<String>, modifier: Modifier) -> Self {
        FieldRef {
            name: name.into(),
            modifier,
        }
    }

    /// Rebuilds the placeholder text this reference was parsed from.
    pub fn placeholder(&self) -> String {
        let marker = match self.modifier {
            Modifier::Plain => String::new(),
            Modifier::Ancestor(level) => "*".repeat(level),
            Modifier::AnyAncestor => "?".to_string(),
            Modifier::ChildList => "&".to_string(),
            Modifier::DescendantCount(_) => "#".to_string(),
            Modifier::FileInfo => "!".to_string(),
        };
        format!("{{*{}{}*}}", marker, self.name)
    }
}

/// One piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Literal(String),
    Field(FieldRef),
}

/// A parsed format string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    tokens: Vec<Token>,
}

impl Template {
    /// Parses a format string. Never fails: malformed placeholders stay
    /// literal.
    pub fn parse(text: &str) -> Self {
        Template {
            tokens: parse(text),
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }
}

/// Splits `text` into literal and field tokens.
pub fn parse(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;

    while let Some(found) = text[pos..].find("{*") {
        let start = pos + found;
        match parse_placeholder(&text[start..]) {
            Some((field, len)) => {
                push_literal(&mut tokens, &text[literal_start..start]);
                tokens.push(Token::Field(field));
                pos = start + len;
                literal_start = pos;
            }
            None => pos = start + 1,
        }
    }
    push_literal(&mut tokens, &text[literal_start..]);
    tokens
}

fn push_literal(tokens: &mut Vec<Token>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Token::Literal(last)) = tokens.last_mut() {
        last.push_str(text);
    } else {
        tokens.push(Token::Literal(text.to_string()));
    }
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.')
}

/// Parses a placeholder at the start of `text` (which begins with `{*`),
/// returning the reference and the number of bytes it spans.
fn parse_placeholder(text: &str) -> Option<(FieldRef, usize)> {
    let body = text.strip_prefix("{*")?;

    let stars = body.chars().take_while(|c| *c == '*').count();
    let (marker, rest) = if stars > 0 {
        (Some('*'), &body[stars..])
    } else {
        match body.chars().next()? {
            ch @ ('?' | '&' | '#' | '!') => (Some(ch), &body[ch.len_utf8()..]),
            _ => (None, body),
        }
    };

    let name_len: usize = rest
        .chars()
        .take_while(|c| is_name_char(*c))
        .map(char::len_utf8)
        .sum();
    if name_len == 0 || !rest[name_len..].starts_with("*}") {
        return None;
    }
    let name = &rest[..name_len];

    let modifier = match marker {
        None => Modifier::Plain,
        Some('*') => Modifier::Ancestor(stars),
        Some('?') => Modifier::AnyAncestor,
        Some('&') => Modifier::ChildList,
        Some('!') => Modifier::FileInfo,
        Some('#') => Modifier::DescendantCount(trailing_level(name)?),
        Some(_) => return None,
    };

    let consumed = text.len() - rest.len() + name_len + 2;
    Some((FieldRef::new(name, modifier), consumed))
}

/// The positive integer at the end of a descendant-count name.
fn trailing_level(name: &str) -> Option<usize> {
    let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    match name[name.len() - digits..].parse::<usize>() {
        Ok(0) | Err(_) => None,
        Ok(level) => Some(level),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, modifier: Modifier) -> Token {
        Token::Field(FieldRef::new(name, modifier))
    }

    fn lit(text: &str) -> Token {
        Token::Literal(text.to_string())
    }

    #[test]
    fn test_plain_fields_and_literals() {
        assert_eq!(
            parse("{*Name*}: {*Age*}"),
            vec![
                field("Name", Modifier::Plain),
                lit(": "),
                field("Age", Modifier::Plain)
            ]
        );
    }

    #[test]
    fn test_ancestor_levels() {
        assert_eq!(parse("{**Name*}"), vec![field("Name", Modifier::Ancestor(1))]);
        assert_eq!(
            parse("{***Name*}"),
            vec![field("Name", Modifier::Ancestor(2))]
        );
    }

    #[test]
    fn test_other_modifiers() {
        assert_eq!(parse("{*?Name*}"), vec![field("Name", Modifier::AnyAncestor)]);
        assert_eq!(parse("{*&Name*}"), vec![field("Name", Modifier::ChildList)]);
        assert_eq!(
            parse("{*!File_Name*}"),
            vec![field("File_Name", Modifier::FileInfo)]
        );
    }

    #[test]
    fn test_descendant_count() {
        assert_eq!(
            parse("{*#Level2*}"),
            vec![field("Level2", Modifier::DescendantCount(2))]
        );
        assert_eq!(
            parse("{*#3*}"),
            vec![field("3", Modifier::DescendantCount(3))]
        );
    }

    #[test]
    fn test_descendant_count_without_level_is_literal() {
        assert_eq!(parse("{*#Level0*}"), vec![lit("{*#Level0*}")]);
        assert_eq!(parse("a {*#Level*} b"), vec![lit("a {*#Level*} b")]);
    }

    #[test]
    fn test_malformed_placeholders_are_literal() {
        assert_eq!(parse("{*Name"), vec![lit("{*Name")]);
        assert_eq!(parse("{**}"), vec![lit("{**}")]);
        assert_eq!(parse("{*bad name*}"), vec![lit("{*bad name*}")]);
        assert_eq!(parse("{Name}"), vec![lit("{Name}")]);
    }

    #[test]
    fn test_malformed_then_valid() {
        assert_eq!(
            parse("{*x {*Name*}"),
            vec![lit("{*x "), field("Name", Modifier::Plain)]
        );
    }

    #[test]
    fn test_empty_literals_dropped() {
        assert_eq!(
            parse("{*A*}{*B*}"),
            vec![field("A", Modifier::Plain), field("B", Modifier::Plain)]
        );
        assert!(parse("").is_empty());
    }

    #[test]
    fn test_names_with_punctuation_and_unicode() {
        assert_eq!(
            parse("{*first.name-2_x*}"),
            vec![field("first.name-2_x", Modifier::Plain)]
        );
        assert_eq!(parse("{*Größe*}"), vec![field("Größe", Modifier::Plain)]);
    }

    #[test]
    fn test_placeholder_round_trip() {
        for text in ["{*A*}", "{***A*}", "{*?A*}", "{*&A*}", "{*#A1*}", "{*!A*}"] {
            let tokens = parse(text);
            match &tokens[..] {
                [Token::Field(f)] => assert_eq!(f.placeholder(), text),
                other => panic!("unexpected tokens {:?}", other),
            }
        }
    }
}
