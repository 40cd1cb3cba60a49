//! Outline numbering: arabic, alphabetic and roman styles.
//!
//! A numbering pattern is compiled once into a [`NumberingGroup`] and then
//! applied to stored dot-separated values such as `"2.3.4"`.
//!
//! # Level style vs section style
//!
//! - **Level style** (sub-patterns separated by `/`): one sub-pattern per
//!   tree depth. Only the last stored segment is printed, using the
//!   sub-pattern for the value's depth. `"1/A/i"` on `"2.3.4"` gives `"iv"`.
//! - **Section style** (sub-patterns separated by `.`): every stored segment
//!   is printed with its own sub-pattern, the last sub-pattern repeating as
//!   needed. `"1."` on `"2.3.4"` gives `"2.3.4"`.
//!
//! A doubled delimiter (`//`, `..`) is a literal character.
//!
//! Each sub-pattern is a literal prefix, one style character and a literal
//! suffix:
//!
//! | Style | Output for 28 |
//! |-------|---------------|
//! | `1` | `28` |
//! | `A` / `a` | `AB` / `ab` |
//! | `I` / `i` | `XXVIII` / `xxviii` |

use crate::markup::{has_single_delimiter, split_escaped};

const ROMAN_TABLE: [(u32, &str); 13] = [
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

/// The digit style of one numbering sub-pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberStyle {
    #[default]
    Arabic,
    UpperAlpha,
    LowerAlpha,
    UpperRoman,
    LowerRoman,
}

impl NumberStyle {
    fn from_char(ch: char) -> Option<Self> {
        match ch {
            '1' => Some(NumberStyle::Arabic),
            'A' => Some(NumberStyle::UpperAlpha),
            'a' => Some(NumberStyle::LowerAlpha),
            'I' => Some(NumberStyle::UpperRoman),
            'i' => Some(NumberStyle::LowerRoman),
            _ => None,
        }
    }

    /// Renders `value` in this style, falling back to arabic digits when
    /// the style cannot express it.
    pub fn render(self, value: u32) -> String {
        match self {
            NumberStyle::Arabic => value.to_string(),
            NumberStyle::UpperAlpha => to_alpha(value).unwrap_or_else(|| value.to_string()),
            NumberStyle::LowerAlpha => to_alpha(value)
                .map(|s| s.to_ascii_lowercase())
                .unwrap_or_else(|| value.to_string()),
            NumberStyle::UpperRoman => to_roman(value).unwrap_or_else(|| value.to_string()),
            NumberStyle::LowerRoman => to_roman(value)
                .map(|s| s.to_ascii_lowercase())
                .unwrap_or_else(|| value.to_string()),
        }
    }
}

/// One sub-pattern: prefix, style, suffix.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BasicNumbering {
    pub prefix: String,
    pub style: NumberStyle,
    pub suffix: String,
}

impl BasicNumbering {
    /// Splits a sub-pattern at its first style character.
    ///
    /// A sub-pattern without a style character is treated as a prefix
    /// followed by arabic digits.
    pub fn parse(pattern: &str) -> Self {
        for (idx, ch) in pattern.char_indices() {
            if let Some(style) = NumberStyle::from_char(ch) {
                return BasicNumbering {
                    prefix: pattern[..idx].to_string(),
                    style,
                    suffix: pattern[idx + ch.len_utf8()..].to_string(),
                };
            }
        }
        BasicNumbering {
            prefix: pattern.to_string(),
            style: NumberStyle::Arabic,
            suffix: String::new(),
        }
    }

    pub fn format(&self, value: u32) -> String {
        format!("{}{}{}", self.prefix, self.style.render(value), self.suffix)
    }
}

/// How a multi-part numbering pattern is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberingMode {
    /// One sub-pattern per depth, applied to the last segment only.
    Level,
    /// One sub-pattern per stored segment.
    Section,
}

/// A compiled numbering pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberingGroup {
    mode: NumberingMode,
    formats: Vec<BasicNumbering>,
}

impl NumberingGroup {
    /// Compiles a numbering pattern.
    pub fn compile(pattern: &str) -> Self {
        let (mode, parts) = if has_single_delimiter(pattern, '/') {
            (NumberingMode::Level, split_escaped(pattern, '/'))
        } else if has_single_delimiter(pattern, '.') {
            let parts = split_escaped(pattern, '.')
                .into_iter()
                .map(|part| part.replace("//", "/"))
                .filter(|part| !part.is_empty())
                .collect();
            (NumberingMode::Section, parts)
        } else {
            (
                NumberingMode::Level,
                vec![pattern.replace("..", ".").replace("//", "/")],
            )
        };

        let mut formats: Vec<BasicNumbering> =
            parts.iter().map(|p| BasicNumbering::parse(p)).collect();
        if formats.is_empty() {
            formats.push(BasicNumbering::default());
        }
        NumberingGroup { mode, formats }
    }

    pub fn mode(&self) -> NumberingMode {
        self.mode
    }

    pub fn formats(&self) -> &[BasicNumbering] {
        &self.formats
    }

    /// Formats a stored dot-separated value such as `"2.3.4"`.
    ///
    /// Returns `None` when any segment is not a non-negative integer.
    pub fn format(&self, stored: &str) -> Option<String> {
        let values = stored
            .trim()
            .split('.')
            .map(|segment| segment.trim().parse::<u32>().ok())
            .collect::<Option<Vec<u32>>>()?;
        let last_format = self.formats.len() - 1;

        match self.mode {
            NumberingMode::Level => {
                let value = *values.last()?;
                let idx = (values.len() - 1).min(last_format);
                Some(self.formats[idx].format(value))
            }
            NumberingMode::Section => Some(
                values
                    .iter()
                    .enumerate()
                    .map(|(i, value)| self.formats[i.min(last_format)].format(*value))
                    .collect::<Vec<_>>()
                    .join("."),
            ),
        }
    }
}

/// Converts to spreadsheet-column letters: 1 → `A`, 26 → `Z`, 27 → `AA`.
///
/// There is no zero digit, so 0 has no representation.
pub fn to_alpha(value: u32) -> Option<String> {
    if value == 0 {
        return None;
    }
    let mut n = value;
    let mut letters = Vec::new();
    while n > 0 {
        n -= 1;
        letters.push((b'A' + (n % 26) as u8) as char);
        n /= 26;
    }
    Some(letters.iter().rev().collect())
}

/// Converts to upper-case roman numerals, for 1 through 3999.
pub fn to_roman(value: u32) -> Option<String> {
    if !(1..=3999).contains(&value) {
        return None;
    }
    let mut n = value;
    let mut result = String::new();
    for (amount, numeral) in ROMAN_TABLE {
        while n >= amount {
            result.push_str(numeral);
            n -= amount;
        }
    }
    Some(result)
}
