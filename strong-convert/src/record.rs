//! Record parsing
//!
//! Turns one raw export row (column name → raw string) into a typed
//! [`FlatRecord`]. Parsing is best effort: a malformed or empty numeric/date
//! value becomes `None`, never an error.
//!
//! The exercise name is always present on a [`FlatRecord`]: a short row with
//! no `Exercise Name` cell reads as the empty name and is grouped, stored and
//! reported exactly like an empty cell.

use chrono::{
    Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike,
    Weekday,
};
use std::collections::HashMap;
use std::fmt;

pub const COL_DATE: &str = "Date";
pub const COL_WORKOUT_NAME: &str = "Workout Name";
pub const COL_EXERCISE_NAME: &str = "Exercise Name";
pub const COL_SET_ORDER: &str = "Set Order";
pub const COL_WEIGHT: &str = "Weight";
pub const COL_WEIGHT_UNIT: &str = "Weight Unit";
pub const COL_REPS: &str = "Reps";
pub const COL_RPE: &str = "RPE";
pub const COL_DISTANCE: &str = "Distance";
pub const COL_DISTANCE_UNIT: &str = "Distance Unit";
pub const COL_SECONDS: &str = "Seconds";
pub const COL_NOTES: &str = "Notes";
pub const COL_WORKOUT_NOTES: &str = "Workout Notes";
pub const COL_WORKOUT_DURATION: &str = "Workout Duration";

/// Every column the export defines, in export order
pub const COLUMNS: [&str; 14] = [
    COL_DATE,
    COL_WORKOUT_NAME,
    COL_EXERCISE_NAME,
    COL_SET_ORDER,
    COL_WEIGHT,
    COL_WEIGHT_UNIT,
    COL_REPS,
    COL_RPE,
    COL_DISTANCE,
    COL_DISTANCE_UNIT,
    COL_SECONDS,
    COL_NOTES,
    COL_WORKOUT_NOTES,
    COL_WORKOUT_DURATION,
];

/// Columns without which a row cannot be grouped
pub const REQUIRED_COLUMNS: [&str; 2] = [COL_DATE, COL_EXERCISE_NAME];

/// One input row before typing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    /// 1-based data row index (header excluded)
    pub row: usize,
    /// Physical line in the input file
    pub line: u64,
    pub fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn new(row: usize, line: u64) -> Self {
        Self {
            row,
            line,
            fields: HashMap::new(),
        }
    }

    /// Builder used by tests and fixtures
    pub fn with(mut self, column: &str, value: &str) -> Self {
        self.fields.insert(column.to_string(), value.to_string());
        self
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

/// A parsed `Date` value
///
/// Keeps the wall-clock fields exactly as written plus the UTC offset when
/// one was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkoutDate {
    pub wall_clock: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

impl WorkoutDate {
    pub fn naive(wall_clock: NaiveDateTime) -> Self {
        Self {
            wall_clock,
            offset: None,
        }
    }

    /// Epoch seconds of the wall-clock fields read as local time, sub-second
    /// part discarded
    ///
    /// Any explicit offset is ignored. An ambiguous local time (DST fall-back)
    /// resolves to the earlier instant; a local time inside a DST gap is read
    /// with the offset in force before the gap.
    pub fn local_epoch_seconds(&self) -> i64 {
        let naive = self.wall_clock.with_nanosecond(0).unwrap_or(self.wall_clock);
        match chrono::Local.from_local_datetime(&naive) {
            LocalResult::Single(t) => t.timestamp(),
            LocalResult::Ambiguous(earliest, _) => earliest.timestamp(),
            LocalResult::None => {
                let before_gap = chrono::Local
                    .offset_from_local_datetime(&(naive - Duration::days(1)))
                    .earliest();
                let utc_seconds = naive.and_utc().timestamp();
                match before_gap {
                    Some(offset) => utc_seconds - i64::from(offset.local_minus_utc()),
                    None => utc_seconds,
                }
            }
        }
    }
}

/// `YYYY-MM-DD HH:MM:SS[.ffffff][±HH:MM]`
impl fmt::Display for WorkoutDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wall_clock.format("%Y-%m-%d %H:%M:%S"))?;
        let micros = self.wall_clock.nanosecond() / 1_000;
        if micros != 0 {
            write!(f, ".{:06}", micros)?;
        }
        if let Some(offset) = self.offset {
            let total = offset.local_minus_utc();
            let sign = if total < 0 { '-' } else { '+' };
            let total = total.abs();
            write!(f, "{}{:02}:{:02}", sign, total / 3600, (total % 3600) / 60)?;
            if total % 60 != 0 {
                write!(f, ":{:02}", total % 60)?;
            }
        }
        Ok(())
    }
}

/// One typed export row
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRecord {
    pub row: usize,
    pub line: u64,
    pub date: Option<WorkoutDate>,
    pub workout_name: Option<String>,
    pub exercise_name: String,
    pub set_order: Option<i64>,
    pub weight: Option<f64>,
    pub weight_unit: Option<String>,
    pub reps: Option<f64>,
    pub rpe: Option<f64>,
    pub distance: Option<f64>,
    pub distance_unit: Option<String>,
    pub seconds: Option<f64>,
    pub notes: Option<String>,
    pub workout_notes: Option<String>,
    pub workout_duration: Option<String>,
}

/// Type one raw row
///
/// String columns pass through untouched: a column missing from the row is
/// `None`, an empty cell is `Some("")`. `Exercise Name` is the exception and
/// falls back to `""`.
pub fn parse_record(raw: &RawRecord) -> FlatRecord {
    let text = |column: &str| raw.get(column).map(str::to_string);

    FlatRecord {
        row: raw.row,
        line: raw.line,
        date: parse_date(raw.get(COL_DATE)),
        workout_name: text(COL_WORKOUT_NAME),
        exercise_name: raw.get(COL_EXERCISE_NAME).unwrap_or_default().to_string(),
        set_order: parse_int(raw.get(COL_SET_ORDER)),
        weight: parse_float(raw.get(COL_WEIGHT)),
        weight_unit: text(COL_WEIGHT_UNIT),
        reps: parse_float(raw.get(COL_REPS)),
        rpe: parse_float(raw.get(COL_RPE)),
        distance: parse_float(raw.get(COL_DISTANCE)),
        distance_unit: text(COL_DISTANCE_UNIT),
        seconds: parse_float(raw.get(COL_SECONDS)),
        notes: text(COL_NOTES),
        workout_notes: text(COL_WORKOUT_NOTES),
        workout_duration: text(COL_WORKOUT_DURATION),
    }
}

/// Parse a floating point cell; empty or malformed → `None`
pub fn parse_float(raw: Option<&str>) -> Option<f64> {
    let cleaned = strip_digit_separators(raw?.trim())?;
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Parse an integer cell; empty, fractional or malformed → `None`
pub fn parse_int(raw: Option<&str>) -> Option<i64> {
    let cleaned = strip_digit_separators(raw?.trim())?;
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<i64>().ok()
}

/// Remove `_` separators that sit between two digits; any other `_` is malformed
fn strip_digit_separators(s: &str) -> Option<String> {
    if !s.contains('_') {
        return Some(s.to_string());
    }
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.char_indices() {
        if c == '_' {
            let prev_digit = i > 0 && bytes[i - 1].is_ascii_digit();
            let next_digit = bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
            if !(prev_digit && next_digit) {
                return None;
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

/// Parse an ISO-8601 date or date-time cell; empty or malformed → `None`
///
/// The date is `YYYY-MM-DD`, `YYYYMMDD` or an ISO week date (`YYYY-Www[-D]`,
/// `YYYYWww[D]`). It may be followed by any single separator character and a
/// time `HH[[:]MM[[:]SS]][{.,}f]`, then `Z` or an offset `±HH[[:]MM[[:]SS]][{.,}f]`.
/// Fractions beyond microseconds are dropped; offsets keep whole seconds.
pub fn parse_date(raw: Option<&str>) -> Option<WorkoutDate> {
    let raw = raw?;
    let date_len = date_length(raw.as_bytes())?;
    if !raw.is_char_boundary(date_len) {
        return None;
    }
    let (date_part, rest) = raw.split_at(date_len);
    let date = parse_calendar(date_part)?;

    let mut chars = rest.chars();
    if chars.next().is_none() {
        return Some(WorkoutDate::naive(date.and_time(NaiveTime::MIN)));
    }
    let (time, offset) = parse_time_and_offset(chars.as_str())?;

    Some(WorkoutDate {
        wall_clock: date.and_time(time),
        offset,
    })
}

/// Length of the leading date portion
///
/// Week dates make the boundary ambiguous when the separator is a digit; a
/// hyphen or the shorter form wins.
fn date_length(b: &[u8]) -> Option<usize> {
    if b.len() < 7 {
        return None;
    }
    if b.len() == 7 {
        return Some(7);
    }
    if b[4] == b'-' {
        if b[5] != b'W' {
            return Some(10);
        }
        if b.len() > 8 && b[8] == b'-' {
            if b.len() == 9 {
                return None;
            }
            if b.len() > 10 && b[10].is_ascii_digit() {
                return Some(8);
            }
            return Some(10);
        }
        return Some(8);
    }
    if b[4] == b'W' {
        let digits_end = 7 + b[7..].iter().take_while(|c| c.is_ascii_digit()).count();
        return Some(match digits_end {
            end if end < 9 => end,
            end if end % 2 == 0 => 7,
            _ => 8,
        });
    }
    Some(8)
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn parse_calendar(s: &str) -> Option<NaiveDate> {
    if !s.is_ascii() || s.len() < 7 {
        return None;
    }
    let year = i32::try_from(digits(&s[..4])?).ok().filter(|y| *y >= 1)?;
    let extended = s.as_bytes()[4] == b'-';
    let rest = if extended { &s[5..] } else { &s[4..] };

    if let Some(week) = rest.strip_prefix('W') {
        let (week, day) = match (week.len(), extended) {
            (2, _) => (week, "1"),
            (4, true) if week.as_bytes()[2] == b'-' => (&week[..2], &week[3..]),
            (3, false) => (&week[..2], &week[2..]),
            _ => return None,
        };
        let day = usize::try_from(digits(day)?).ok()?;
        let weekday = *WEEKDAYS.get(day.checked_sub(1)?)?;
        return NaiveDate::from_isoywd_opt(year, digits(week)?, weekday);
    }

    let (month, day) = match (rest.len(), extended) {
        (5, true) if rest.as_bytes()[2] == b'-' => (&rest[..2], &rest[3..]),
        (4, false) => (&rest[..2], &rest[2..]),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, digits(month)?, digits(day)?)
}

fn digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Time of day plus optional offset
///
/// The offset starts at the first `Z`, `+` or `-`; `Z` must end the string.
fn parse_time_and_offset(s: &str) -> Option<(NaiveTime, Option<FixedOffset>)> {
    if !s.is_ascii() {
        return None;
    }
    let idx = s.find(['Z', '+', '-']).unwrap_or(s.len());
    let (h, m, sec, micros) = parse_clock(&s[..idx])?;
    let time = NaiveTime::from_hms_micro_opt(h, m, sec, micros)?;

    let offset = match s.as_bytes().get(idx) {
        None => None,
        Some(b'Z') if idx + 1 == s.len() => Some(FixedOffset::east_opt(0)?),
        Some(b'Z') => return None,
        Some(&sign) => {
            let (oh, om, os, _) = parse_clock(&s[idx + 1..])?;
            let total = i32::try_from(oh * 3600 + om * 60 + os).ok()?;
            let total = if sign == b'-' { -total } else { total };
            Some(FixedOffset::east_opt(total)?)
        }
    };
    Some((time, offset))
}

/// `HH[[:]MM[[:]SS]][{.,}f]` into hours, minutes, seconds, microseconds
///
/// Separators are all-or-nothing: once the first `:` is seen every later
/// component needs one too. Range checks are left to the caller.
fn parse_clock(s: &str) -> Option<(u32, u32, u32, u32)> {
    let b = s.as_bytes();
    let mut parts = [0u32; 3];
    let mut pos = 0;
    let mut extended = false;

    for (i, part) in parts.iter_mut().enumerate() {
        if b.len() < pos + 2 {
            return None;
        }
        *part = digits(&s[pos..pos + 2])?;
        pos += 2;
        let Some(&next) = b.get(pos) else { break };
        if i == 0 {
            extended = next == b':';
        }
        if next == b'.' || next == b',' || i == 2 {
            break;
        }
        if extended {
            if next != b':' {
                return None;
            }
            pos += 1;
        }
    }

    let mut micros = 0;
    if pos < b.len() {
        if b[pos] != b'.' && b[pos] != b',' {
            return None;
        }
        let fraction = &s[pos + 1..];
        if !fraction.bytes().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let kept = &fraction[..fraction.len().min(6)];
        micros = digits(kept)? * 10u32.pow(6 - kept.len() as u32);
    }

    Some((parts[0], parts[1], parts[2], micros))
}
