//! Calendar arithmetic backing `AppendTime`/`AppendDuration` (C1). No
//! calendar crate in the corpus fits a JSON-encoder-only scope, so this is a
//! direct, hand-written implementation of Howard Hinnant's well-known
//! "days from civil" algorithm (public domain), used only to turn a
//! `SystemTime` into the year/month/day/time-of-day fields an RFC 3339
//! string needs.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A timestamp decomposed into UTC calendar fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilTime {
    pub year: i64,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub nanos: u32,
    /// `0` = Sunday .. `6` = Saturday, matching Go's `time.Weekday`.
    pub weekday: u32,
}

/// Decompose `time` (relative to the Unix epoch) into UTC calendar fields.
/// Times before the epoch are supported; `time` itself may be before
/// `UNIX_EPOCH`, in which case `secs`/`nanos` are derived accordingly.
pub fn to_civil(time: SystemTime) -> CivilTime {
    let (secs, nanos): (i64, u32) = match time.duration_since(UNIX_EPOCH) {
        Ok(d) => (d.as_secs() as i64, d.subsec_nanos()),
        Err(e) => {
            let d = e.duration();
            if d.subsec_nanos() == 0 {
                (-(d.as_secs() as i64), 0)
            } else {
                (-(d.as_secs() as i64) - 1, 1_000_000_000 - d.subsec_nanos())
            }
        }
    };

    let days = secs.div_euclid(86_400);
    let time_of_day = secs.rem_euclid(86_400);

    let (year, month, day) = civil_from_days(days);

    // 1970-01-01 (day 0) was a Thursday (weekday index 4).
    let weekday = ((days.rem_euclid(7) + 4) % 7) as u32;

    CivilTime {
        year,
        month,
        day,
        hour: (time_of_day / 3600) as u32,
        minute: ((time_of_day % 3600) / 60) as u32,
        second: (time_of_day % 60) as u32,
        nanos,
        weekday,
    }
}

/// Howard Hinnant's `civil_from_days`: convert a day count since the Unix
/// epoch (1970-01-01) into a proleptic-Gregorian `(year, month, day)`.
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as u64; // [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365; // [0, 399]
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // [0, 11]
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32; // [1, 31]
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32; // [1, 12]
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

/// Whether `time`'s UTC calendar year falls within `0..=9999` (spec §4.1:
/// "Error if year ∉ [0, 9999]").
pub fn year_in_range(time: SystemTime) -> bool {
    let c = to_civil(time);
    (0..=9999).contains(&c.year)
}

/// Render `time` as an RFC 3339 UTC timestamp, e.g.
/// `2024-03-05T12:34:56.789Z`. The fractional part is omitted when zero.
/// Callers must check [`year_in_range`] first; this produces a 5+-digit year
/// for out-of-range input rather than erroring, since year validity is a
/// call-site concern (spec §4.1), not something the formatter itself polices.
pub fn format_rfc3339(time: SystemTime) -> String {
    let c = to_civil(time);
    if c.nanos == 0 {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            c.year, c.month, c.day, c.hour, c.minute, c.second
        )
    } else {
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:09}Z",
            c.year, c.month, c.day, c.hour, c.minute, c.second, c.nanos
        )
    }
}

const MONTH_ABBREV: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const MONTH_FULL: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];
const WEEKDAY_ABBREV: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const WEEKDAY_FULL: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];

/// Render `time` per a Go-style reference-time layout string (spec §4.1/§6
/// `TimeLayout`), e.g. `"2006-01-02"` or `"Mon Jan 2 15:04:05 2006"`. Scans
/// `layout` left to right and substitutes the longest recognized
/// reference-time token at each position, copying any other byte through
/// literally — the same strategy Go's own `time.Format` uses. This crate's
/// clock is always UTC (`SystemTime` carries no zone), so zone tokens (`MST`,
/// `Z07:00`, `-07:00`, ...) always render the UTC/zero-offset case.
pub fn format_layout(time: SystemTime, layout: &str) -> String {
    let c = to_civil(time);
    let hour12 = match c.hour % 12 {
        0 => 12,
        h => h,
    };

    let mut out = String::with_capacity(layout.len() + 8);
    let bytes = layout.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match match_token(&layout[i..], &c, hour12) {
            Some((rendered, consumed)) => {
                out.push_str(&rendered);
                i += consumed;
            }
            None => {
                out.push(bytes[i] as char);
                i += 1;
            }
        }
    }
    out
}

/// Try to match one reference-time token at the start of `rest`. Checked
/// longest-match-first so e.g. `"2006"` wins over bare `"2"` and `"January"`
/// wins over `"Jan"`. Returns the rendered replacement and the number of
/// input bytes it consumed.
fn match_token(rest: &str, c: &CivilTime, hour12: u32) -> Option<(String, usize)> {
    macro_rules! tok {
        ($lit:expr, $val:expr) => {
            if rest.starts_with($lit) {
                return Some(($val, $lit.len()));
            }
        };
    }

    tok!("2006", format!("{:04}", c.year));
    tok!("06", format!("{:02}", c.year.rem_euclid(100)));

    tok!("January", MONTH_FULL[(c.month - 1) as usize].to_string());
    tok!("Jan", MONTH_ABBREV[(c.month - 1) as usize].to_string());
    tok!("01", format!("{:02}", c.month));

    tok!("Monday", WEEKDAY_FULL[c.weekday as usize].to_string());
    tok!("Mon", WEEKDAY_ABBREV[c.weekday as usize].to_string());

    tok!("02", format!("{:02}", c.day));
    tok!("_2", format!("{:2}", c.day));

    tok!("15", format!("{:02}", c.hour));
    tok!("03", format!("{:02}", hour12));
    tok!("04", format!("{:02}", c.minute));
    tok!("05", format!("{:02}", c.second));

    tok!("PM", (if c.hour < 12 { "AM" } else { "PM" }).to_string());
    tok!("pm", (if c.hour < 12 { "am" } else { "pm" }).to_string());

    tok!(".000000000", format!(".{:09}", c.nanos));
    tok!(".000000", format!(".{:06}", c.nanos / 1_000));
    tok!(".000", format!(".{:03}", c.nanos / 1_000_000));

    tok!(".999999999", trimmed_fraction(c.nanos, 9));
    tok!(".999999", trimmed_fraction(c.nanos / 1_000, 6));
    tok!(".999", trimmed_fraction(c.nanos / 1_000_000, 3));

    tok!("Z07:00", "Z".to_string());
    tok!("Z0700", "Z".to_string());
    tok!("-07:00", "+00:00".to_string());
    tok!("-0700", "+0000".to_string());
    tok!("MST", "UTC".to_string());

    // Bare single-digit forms checked last: every multi-character token
    // above that starts with the same digit (e.g. "2006", "15") is checked
    // first, so these only fire when none of the more specific forms do.
    tok!("1", format!("{}", c.month));
    tok!("2", format!("{}", c.day));
    tok!("3", format!("{}", hour12));
    tok!("4", format!("{}", c.minute));
    tok!("5", format!("{}", c.second));

    None
}

/// A fractional-second token (Go's `.999...`): zero-padded to `digits` places
/// then trimmed of trailing zeros, omitted (including the leading `.`)
/// entirely when the fraction is zero.
fn trimmed_fraction(value: u32, digits: usize) -> String {
    if value == 0 {
        return String::new();
    }
    let text = format!("{:0width$}", value, width = digits);
    format!(".{}", text.trim_end_matches('0'))
}

/// Render `duration` per the configured [`crate::options::DurationFormat`].
/// `negative` mirrors the reference encoder's sign handling for a
/// caller-supplied signed duration (`std::time::Duration` itself is always
/// non-negative; callers representing negative durations, e.g. as `i64`
/// nanoseconds, pass the sign separately).
pub fn format_duration(
    duration: Duration,
    negative: bool,
    format: crate::options::DurationFormat,
) -> String {
    use crate::options::DurationFormat;

    let sign = if negative && !duration.is_zero() { "-" } else { "" };

    match format {
        DurationFormat::Nanoseconds => format!("{sign}{}", duration.as_nanos()),
        DurationFormat::Microseconds => format!("{sign}{}", duration.as_micros()),
        DurationFormat::Milliseconds => format!("{sign}{}", duration.as_millis()),
        DurationFormat::Minutes => format!("{sign}{}", duration.as_secs() / 60),
        DurationFormat::Seconds => {
            let secs = duration.as_secs();
            let nanos = duration.subsec_nanos();
            if nanos == 0 {
                format!("{sign}{secs}")
            } else {
                let frac = trim_trailing_zeros(&format!("{:09}", nanos));
                format!("{sign}{secs}.{frac}")
            }
        }
        DurationFormat::String => format!("{sign}{}", format_cascade(duration)),
    }
}

fn trim_trailing_zeros(s: &str) -> String {
    s.trim_end_matches('0').to_string()
}

/// Mirrors Go's `time.Duration.String()`: durations of a second or more
/// cascade `h`/`m`/`s` with a fractional-second remainder; durations under a
/// second pick the largest of `ms`/`µs`/`ns` that keeps the mantissa a whole
/// or simple decimal number.
fn format_cascade(duration: Duration) -> String {
    let total_nanos = duration.as_nanos();
    if total_nanos == 0 {
        return "0s".to_string();
    }

    if total_nanos < 1_000_000_000 {
        return format_sub_second(total_nanos);
    }

    let hours = total_nanos / 3_600_000_000_000;
    let rem = total_nanos % 3_600_000_000_000;
    let minutes = rem / 60_000_000_000;
    let rem = rem % 60_000_000_000;
    let whole_secs = rem / 1_000_000_000;
    let frac_nanos = (rem % 1_000_000_000) as u32;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    if frac_nanos == 0 {
        out.push_str(&format!("{whole_secs}s"));
    } else {
        let frac = trim_trailing_zeros(&format!("{:09}", frac_nanos));
        out.push_str(&format!("{whole_secs}.{frac}s"));
    }
    out
}

fn format_sub_second(total_nanos: u128) -> String {
    if total_nanos < 1_000 {
        return format!("{total_nanos}ns");
    }
    if total_nanos < 1_000_000 {
        let whole = total_nanos / 1_000;
        let frac = total_nanos % 1_000;
        return format_unit_with_fraction(whole, frac, 3, "\u{b5}s");
    }
    let whole = total_nanos / 1_000_000;
    let frac = total_nanos % 1_000_000;
    format_unit_with_fraction(whole, frac, 6, "ms")
}

fn format_unit_with_fraction(whole: u128, frac: u128, frac_digits: usize, unit: &str) -> String {
    if frac == 0 {
        format!("{whole}{unit}")
    } else {
        let frac_str = trim_trailing_zeros(&format!("{:0width$}", frac, width = frac_digits));
        format!("{whole}.{frac_str}{unit}")
    }
}
