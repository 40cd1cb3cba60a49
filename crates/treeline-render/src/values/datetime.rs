//! Date and time formatting with `%` directives.
//!
//! Stored dates are `YYYY-MM-DD`, stored times are `HH:MM[:SS[.ffffff]]`.
//! Weekdays and day-of-year numbers are computed directly from the
//! Gregorian rules, so no calendar library is involved.
//!
//! | Directive | Output |
//! |-----------|--------|
//! | `%d` / `%-d` | Day of month, padded / unpadded |
//! | `%a` / `%A` | Weekday, abbreviated / full |
//! | `%m` / `%-m` | Month number, padded / unpadded |
//! | `%b` / `%B` | Month name, abbreviated / full |
//! | `%y` / `%Y` | Two / four digit year |
//! | `%U` / `%-U` | Week of year, Sunday first |
//! | `%j` / `%-j` | Day of year |
//! | `%H` / `%-H` | Hour, 24-hour clock |
//! | `%I` / `%-I` | Hour, 12-hour clock |
//! | `%M` / `%-M` | Minute |
//! | `%S` / `%-S` | Second |
//! | `%f` | Microseconds |
//! | `%p` | `AM` / `PM` |
//! | `%%` | Literal `%` |
//!
//! Directives that need a part the value does not have (a time directive
//! applied to a bare date, say) are left in place.

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const MONTH_DAYS: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// A calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Date {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl Date {
    /// Creates a date, checking month and day ranges.
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        if !(1..=9999).contains(&year) || !(1..=12).contains(&month) || day == 0 {
            return None;
        }
        if day > days_in_month(year, month) {
            return None;
        }
        Some(Date { year, month, day })
    }

    /// Parses a stored `YYYY-MM-DD` date.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().split('-');
        let year = parts.next()?.parse().ok()?;
        let month = parts.next()?.parse().ok()?;
        let day = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Date::new(year, month, day)
    }

    /// Zero-based day of the year.
    pub fn day_of_year(&self) -> u32 {
        let before: u32 = (1..self.month).map(|m| days_in_month(self.year, m)).sum();
        before + self.day - 1
    }

    /// Day of the week, Sunday = 0.
    pub fn weekday(&self) -> u32 {
        (first_weekday(self.year) + self.day_of_year()) % 7
    }

    /// Week of the year with Sunday as the first day; days before the
    /// first Sunday are in week 0.
    pub fn sunday_week(&self) -> u32 {
        (self.day_of_year() + 7 - self.weekday()) / 7
    }
}

/// A time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Time {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub microsecond: u32,
}

impl Time {
    /// Parses a stored `HH:MM[:SS[.ffffff]]` time.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().split(':');
        let hour: u32 = parts.next()?.parse().ok()?;
        let minute: u32 = parts.next()?.parse().ok()?;
        let (second, microsecond) = match parts.next() {
            Some(sec) => parse_seconds(sec)?,
            None => (0, 0),
        };
        if parts.next().is_some() || hour > 23 || minute > 59 || second > 59 {
            return None;
        }
        Some(Time {
            hour,
            minute,
            second,
            microsecond,
        })
    }

    /// Hour on the 12-hour clock plus whether it is afternoon.
    ///
    /// 0 is 12 AM, 12 is 12 PM, 13 through 23 become 1 through 11 PM.
    pub fn twelve_hour(&self) -> (u32, bool) {
        match self.hour {
            0 => (12, false),
            h @ 1..=11 => (h, false),
            12 => (12, true),
            h => (h - 12, true),
        }
    }
}

fn parse_seconds(text: &str) -> Option<(u32, u32)> {
    let (whole, frac) = text.split_once('.').unwrap_or((text, ""));
    let second = whole.parse().ok()?;
    if frac.is_empty() {
        return Some((second, 0));
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let padded: String = frac.chars().chain(std::iter::repeat('0')).take(6).collect();
    Some((second, padded.parse().ok()?))
}

/// Returns `true` for Gregorian leap years.
pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u32) -> u32 {
    if month == 2 && is_leap_year(year) {
        29
    } else {
        MONTH_DAYS[(month - 1) as usize]
    }
}

/// Weekday of January 1st (Sunday = 0), by Gauss's method.
fn first_weekday(year: i32) -> u32 {
    let y = year - 1;
    (1 + 5 * (y % 4) + 4 * (y % 100) + 6 * (y % 400)).rem_euclid(7) as u32
}

/// Formats a stored date. Returns `None` when the date cannot be parsed.
///
/// ```rust
/// use treeline_render::values::format_date;
///
/// assert_eq!(
///     format_date("2024-03-15", "%A, %B %-d, %Y").as_deref(),
///     Some("Friday, March 15, 2024")
/// );
/// ```
pub fn format_date(stored: &str, pattern: &str) -> Option<String> {
    let date = Date::parse(stored)?;
    Some(expand(pattern, Some(&date), None))
}

/// Formats a stored time. Returns `None` when the time cannot be parsed.
pub fn format_time(stored: &str, pattern: &str) -> Option<String> {
    let time = Time::parse(stored)?;
    Some(expand(pattern, None, Some(&time)))
}

/// Formats a stored `"<date> <time>"` value with one pattern.
///
/// A `T` separator is accepted as well. A bare date formats the date
/// directives only.
pub fn format_datetime(stored: &str, pattern: &str) -> Option<String> {
    let stored = stored.trim();
    let (date_text, time_text) = match stored.split_once(|c: char| c == ' ' || c == 'T') {
        Some((date, time)) => (date, Some(time)),
        None => (stored, None),
    };
    let date = Date::parse(date_text)?;
    let time = match time_text {
        Some(text) => Some(Time::parse(text)?),
        None => None,
    };
    Some(expand(pattern, Some(&date), time.as_ref()))
}

fn expand(pattern: &str, date: Option<&Date>, time: Option<&Time>) -> String {
    let mut result = String::with_capacity(pattern.len() + 16);
    let mut chars = pattern.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '%' {
            result.push(ch);
            continue;
        }
        let unpadded = chars.peek() == Some(&'-');
        if unpadded {
            chars.next();
        }
        let Some(code) = chars.next() else {
            result.push('%');
            if unpadded {
                result.push('-');
            }
            break;
        };
        match directive(code, unpadded, date, time) {
            Some(text) => result.push_str(&text),
            None => {
                result.push('%');
                if unpadded {
                    result.push('-');
                }
                result.push(code);
            }
        }
    }
    result
}

fn number(value: u32, unpadded: bool) -> String {
    if unpadded {
        value.to_string()
    } else {
        format!("{:02}", value)
    }
}

fn directive(
    code: char,
    unpadded: bool,
    date: Option<&Date>,
    time: Option<&Time>,
) -> Option<String> {
    let text = match code {
        '%' => "%".to_string(),
        'd' => number(date?.day, unpadded),
        'a' => WEEKDAYS[date?.weekday() as usize][..3].to_string(),
        'A' => WEEKDAYS[date?.weekday() as usize].to_string(),
        'm' => number(date?.month, unpadded),
        'b' => MONTHS[(date?.month - 1) as usize][..3].to_string(),
        'B' => MONTHS[(date?.month - 1) as usize].to_string(),
        'y' => number(date?.year.rem_euclid(100) as u32, unpadded),
        'Y' => {
            if unpadded {
                date?.year.to_string()
            } else {
                format!("{:04}", date?.year)
            }
        }
        'U' => number(date?.sunday_week(), unpadded),
        'j' => {
            let day = date?.day_of_year() + 1;
            if unpadded {
                day.to_string()
            } else {
                format!("{:03}", day)
            }
        }
        'H' => number(time?.hour, unpadded),
        'I' => number(time?.twelve_hour().0, unpadded),
        'M' => number(time?.minute, unpadded),
        'S' => number(time?.second, unpadded),
        'f' => format!("{:06}", time?.microsecond),
        'p' => {
            if time?.twelve_hour().1 {
                "PM".to_string()
            } else {
                "AM".to_string()
            }
        }
        _ => return None,
    };
    Some(text)
}
