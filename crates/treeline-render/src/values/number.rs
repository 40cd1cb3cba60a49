//! Pattern-driven number formatting.
//!
//! # Pattern Syntax
//!
//! | Char | Meaning |
//! |------|---------|
//! | `#` | Optional digit |
//! | `0` | Required digit (zero padded) |
//! | space | Digit, or a space when there is no digit |
//! | `+` | Sign, always shown |
//! | `-` | Sign, shown for negative numbers only |
//! | `e` / `E` | Switches to scientific notation |
//! | `\x` | Literal `x` |
//!
//! Anything else is literal text. The radix is `.` unless the pattern
//! escapes the dot (`\.`), or uses `,` without any `.`; then it is `,`.
//!
//! ```rust
//! use treeline_render::values::format_number;
//!
//! assert_eq!(format_number(1234567.891, "#,###,###.##"), "1,234,567.89");
//! assert_eq!(format_number(0.0, "#.##"), "0");
//! assert_eq!(format_number(12345.0, "0.00e+00"), "1.23e+04");
//! ```

#[derive(Debug, Clone, Copy)]
struct PatChar {
    ch: char,
    escaped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Digit {
    Optional,
    Required,
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sign {
    Always,
    NegativeOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Digit(Digit),
    Sign(Sign),
    Radix(char),
    Literal(char),
}

#[derive(Debug)]
enum Piece {
    Text(String),
    Sign(Sign),
}

/// Formats `value` according to `pattern`.
///
/// Non-finite values are rendered with their default representation.
pub fn format_number(value: f64, pattern: &str) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let chars = scan(pattern);
    let radix = radix_char(&chars);

    match chars
        .iter()
        .position(|c| !c.escaped && (c.ch == 'e' || c.ch == 'E'))
    {
        Some(idx) => format_scientific(
            value,
            &compile(&chars[..idx], radix),
            chars[idx].ch,
            &compile(&chars[idx + 1..], radix),
        ),
        None => format_plain(value, &compile(&chars, radix)),
    }
}

fn scan(pattern: &str) -> Vec<PatChar> {
    let mut result = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next) => result.push(PatChar {
                    ch: next,
                    escaped: true,
                }),
                None => result.push(PatChar {
                    ch,
                    escaped: true,
                }),
            }
        } else {
            result.push(PatChar { ch, escaped: false });
        }
    }
    result
}

fn radix_char(chars: &[PatChar]) -> char {
    let escaped_dot = chars.iter().any(|c| c.escaped && c.ch == '.');
    let plain_dot = chars.iter().any(|c| !c.escaped && c.ch == '.');
    let plain_comma = chars.iter().any(|c| !c.escaped && c.ch == ',');
    if escaped_dot || (plain_comma && !plain_dot) {
        ','
    } else {
        '.'
    }
}

fn compile(chars: &[PatChar], radix: char) -> Vec<Slot> {
    let mut seen_radix = false;
    chars
        .iter()
        .map(|c| {
            if c.escaped {
                return Slot::Literal(c.ch);
            }
            match c.ch {
                '#' => Slot::Digit(Digit::Optional),
                '0' => Slot::Digit(Digit::Required),
                ' ' => Slot::Digit(Digit::Space),
                '+' => Slot::Sign(Sign::Always),
                '-' => Slot::Sign(Sign::NegativeOnly),
                ch if ch == radix && !seen_radix => {
                    seen_radix = true;
                    Slot::Radix(ch)
                }
                ch => Slot::Literal(ch),
            }
        })
        .collect()
}

fn split_at_radix(slots: &[Slot]) -> (&[Slot], Option<char>, &[Slot]) {
    match slots.iter().position(|s| matches!(s, Slot::Radix(_))) {
        Some(idx) => {
            let radix = match slots[idx] {
                Slot::Radix(ch) => Some(ch),
                _ => None,
            };
            (&slots[..idx], radix, &slots[idx + 1..])
        }
        None => (slots, None, &[]),
    }
}

fn digit_count(slots: &[Slot]) -> usize {
    slots.iter().filter(|s| matches!(s, Slot::Digit(_))).count()
}

fn format_plain(value: f64, slots: &[Slot]) -> String {
    let (whole_slots, radix, frac_slots) = split_at_radix(slots);
    let frac_count = digit_count(frac_slots);

    let text = format!("{:.*}", frac_count, value.abs());
    let (whole_digits, frac_digits) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let negative = value < 0.0 && text.bytes().any(|b| (b'1'..=b'9').contains(&b));

    let mut pieces = whole_pieces(whole_slots, whole_digits);
    if let Some(radix) = radix {
        let (frac, kept_digit) = frac_pieces(frac_slots, frac_digits);
        if kept_digit {
            pieces.push(Piece::Text(radix.to_string()));
        } else if frac_slots.contains(&Slot::Digit(Digit::Space)) {
            pieces.push(Piece::Text(" ".to_string()));
        }
        pieces.extend(frac);
    }
    join_pieces(pieces, negative)
}

fn whole_pieces(slots: &[Slot], digits: &str) -> Vec<Piece> {
    let digits: Vec<char> = digits.chars().collect();
    let mut remaining = digits.len();
    let leftmost = slots.iter().position(|s| matches!(s, Slot::Digit(_)));
    let mut reversed = Vec::new();

    for (i, slot) in slots.iter().enumerate().rev() {
        match *slot {
            Slot::Digit(kind) => {
                if remaining > 0 {
                    if Some(i) == leftmost {
                        reversed.push(Piece::Text(digits[..remaining].iter().collect()));
                        remaining = 0;
                    } else {
                        reversed.push(Piece::Text(digits[remaining - 1].to_string()));
                        remaining -= 1;
                    }
                } else {
                    match kind {
                        Digit::Required => reversed.push(Piece::Text("0".to_string())),
                        Digit::Space => reversed.push(Piece::Text(" ".to_string())),
                        Digit::Optional => {}
                    }
                }
            }
            Slot::Literal(ch) => {
                // Grouping characters vanish once the digits run out, unless
                // padding placeholders further left still need them.
                let is_prefix = leftmost.map_or(true, |left| i < left);
                let padded_left = slots[..i]
                    .iter()
                    .any(|s| matches!(s, Slot::Digit(Digit::Required | Digit::Space)));
                if is_prefix || remaining > 0 || padded_left {
                    reversed.push(Piece::Text(ch.to_string()));
                }
            }
            Slot::Sign(kind) => reversed.push(Piece::Sign(kind)),
            Slot::Radix(_) => {}
        }
    }

    if leftmost.is_none() && digits.iter().any(|d| *d != '0') {
        reversed.push(Piece::Text(digits.iter().collect()));
    }
    reversed.reverse();
    reversed
}

fn frac_pieces(slots: &[Slot], digits: &str) -> (Vec<Piece>, bool) {
    let mut digits = digits.chars();
    let assigned: Vec<Option<char>> = slots
        .iter()
        .map(|s| match s {
            Slot::Digit(_) => digits.next(),
            _ => None,
        })
        .collect();

    let last_keep = slots
        .iter()
        .zip(&assigned)
        .enumerate()
        .filter_map(|(i, (slot, digit))| match (slot, digit) {
            (Slot::Digit(Digit::Required), _) => Some(i),
            (Slot::Digit(_), Some(d)) if *d != '0' => Some(i),
            _ => None,
        })
        .last();

    let mut pieces = Vec::new();
    for (i, (slot, digit)) in slots.iter().zip(&assigned).enumerate() {
        match *slot {
            Slot::Digit(kind) => {
                if last_keep.is_some_and(|keep| i <= keep) {
                    pieces.push(Piece::Text(digit.unwrap_or('0').to_string()));
                } else if kind == Digit::Space {
                    pieces.push(Piece::Text(" ".to_string()));
                }
            }
            Slot::Literal(ch) | Slot::Radix(ch) => pieces.push(Piece::Text(ch.to_string())),
            Slot::Sign(kind) => pieces.push(Piece::Sign(kind)),
        }
    }
    (pieces, last_keep.is_some())
}

fn join_pieces(pieces: Vec<Piece>, negative: bool) -> String {
    let has_sign_slot = pieces.iter().any(|p| matches!(p, Piece::Sign(_)));
    let mut result = String::new();
    let mut sign_placed = false;

    for piece in pieces {
        match piece {
            Piece::Text(text) => result.push_str(&text),
            Piece::Sign(kind) if !sign_placed => {
                sign_placed = true;
                if negative {
                    result.push('-');
                } else if kind == Sign::Always {
                    result.push('+');
                }
            }
            Piece::Sign(_) => {}
        }
    }

    if negative && !has_sign_slot {
        let idx = result.find(|c: char| c.is_ascii_digit()).unwrap_or(0);
        result.insert(idx, '-');
    }
    result
}

fn format_scientific(value: f64, mantissa: &[Slot], exp_char: char, exponent: &[Slot]) -> String {
    let (whole_slots, _, frac_slots) = split_at_radix(mantissa);
    let whole_count = digit_count(whole_slots).max(1) as i32;
    let frac_count = digit_count(frac_slots) as i32;

    let (mut mant, mut exp) = if value == 0.0 {
        (0.0, 0)
    } else {
        let exp = value.abs().log10().floor() as i32 - (whole_count - 1);
        (value / 10f64.powi(exp), exp)
    };

    let upper = 10f64.powi(whole_count);
    let scale = 10f64.powi(frac_count);
    if mant != 0.0 && mant.abs() < upper / 10.0 {
        mant *= 10.0;
        exp -= 1;
    }
    if (mant.abs() * scale).round() / scale >= upper {
        mant /= 10.0;
        exp += 1;
    }

    format!(
        "{}{}{}",
        format_plain(mant, mantissa),
        exp_char,
        format_plain(f64::from(exp), exponent)
    )
}
