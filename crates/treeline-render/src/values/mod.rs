//! Per-type value formatters.
//!
//! These are pure functions from a raw stored string (plus a type-specific
//! pattern) to display text. They know nothing about nodes or templates;
//! [`crate::field`] decides which one applies.

pub mod datetime;
pub mod number;
pub mod numbering;

pub use datetime::{format_date, format_datetime, format_time, is_leap_year, Date, Time};
pub use number::format_number;
pub use numbering::{
    to_alpha, to_roman, BasicNumbering, NumberStyle, NumberingGroup, NumberingMode,
};
