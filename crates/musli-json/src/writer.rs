//! The conformant JSON writer (C1): low-level byte emission against a
//! [`Sink`] trait object — integer/float formatting, string escaping, and
//! base64. Grounded on the teacher's `en.rs` (`itoa`/`ryu` buffers, the
//! `ESCAPE` lookup table copied from serde_json) and extended per the
//! HTML/line-separator/UTF-8-coercion rules this crate's `Options` adds.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use musli_json_core::{Error, Options, Sink};

pub(crate) fn append_bool(sink: &mut dyn Sink, value: bool) -> Result<(), Error> {
    sink.write_bytes(if value { b"true" } else { b"false" })
}

/// `AppendInt`: decimal fast path via `itoa`; bases in `2..=10` are emitted
/// unquoted, bases in `11..=36` are quoted since JSON numbers have no digits
/// past `9` (spec §4.1).
pub(crate) fn append_signed(sink: &mut dyn Sink, value: i128, base: u32) -> Result<(), Error> {
    if base == 10 {
        let mut buf = itoa::Buffer::new();
        sink.write_bytes(buf.format(value).as_bytes())
    } else if base <= 10 {
        sink.write_bytes(format_radix_signed(value, base).as_bytes())
    } else {
        write_quoted(sink, format_radix_signed(value, base).as_bytes())
    }
}

/// `AppendUint`: see [`append_signed`].
pub(crate) fn append_unsigned(sink: &mut dyn Sink, value: u128, base: u32) -> Result<(), Error> {
    if base == 10 {
        let mut buf = itoa::Buffer::new();
        sink.write_bytes(buf.format(value).as_bytes())
    } else if base <= 10 {
        sink.write_bytes(format_radix_unsigned(value, base).as_bytes())
    } else {
        write_quoted(sink, format_radix_unsigned(value, base).as_bytes())
    }
}

fn write_quoted(sink: &mut dyn Sink, bytes: &[u8]) -> Result<(), Error> {
    sink.write_byte(b'"')?;
    sink.write_bytes(bytes)?;
    sink.write_byte(b'"')
}

fn format_radix_unsigned(mut value: u128, base: u32) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let digit = (value % base as u128) as u32;
        digits.push(std::char::from_digit(digit, base).expect("base validated to 2..=36"));
        value /= base as u128;
    }
    digits.iter().rev().collect()
}

fn format_radix_signed(value: i128, base: u32) -> String {
    if value < 0 {
        format!("-{}", format_radix_unsigned(value.unsigned_abs(), base))
    } else {
        format_radix_unsigned(value as u128, base)
    }
}

/// `AppendFloat` for `f32`: NaN/±∞ have no JSON representation (spec §4.1).
pub(crate) fn append_f32(sink: &mut dyn Sink, value: f32) -> Result<(), Error> {
    if !value.is_finite() {
        return Err(Error::unsupported_value(format!(
            "non-finite f32 value {value} has no JSON representation"
        )));
    }
    let mut buf = ryu::Buffer::new();
    sink.write_bytes(buf.format(value).as_bytes())
}

/// `AppendFloat` for `f64`: see [`append_f32`].
pub(crate) fn append_f64(sink: &mut dyn Sink, value: f64) -> Result<(), Error> {
    if !value.is_finite() {
        return Err(Error::unsupported_value(format!(
            "non-finite f64 value {value} has no JSON representation"
        )));
    }
    let mut buf = ryu::Buffer::new();
    sink.write_bytes(buf.format(value).as_bytes())
}

/// `AppendBase64`: standard RFC 4648 alphabet, wrapped in quotes. Empty
/// input emits `""`.
pub(crate) fn append_base64(sink: &mut dyn Sink, bytes: &[u8]) -> Result<(), Error> {
    sink.write_byte(b'"')?;
    if !bytes.is_empty() {
        sink.write_bytes(BASE64.encode(bytes).as_bytes())?;
    }
    sink.write_byte(b'"')
}

/// A byte slice rendered as a raw JSON array of numbers (the `RawByteSlice`/
/// non-default `ByteArrayAsString` shape).
pub(crate) fn append_byte_array(sink: &mut dyn Sink, bytes: &[u8]) -> Result<(), Error> {
    sink.write_byte(b'[')?;
    let mut buf = itoa::Buffer::new();
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            sink.write_byte(b',')?;
        }
        sink.write_bytes(buf.format(*b).as_bytes())?;
    }
    sink.write_byte(b']')
}

/// `AppendString`: wraps `value` in double quotes and escapes per §4.2.
/// `value` is a `&str`, so it is always valid UTF-8 by construction — the
/// "invalid UTF-8 byte sequences replaced by U+FFFD" rule the spec
/// describes has no code path to exercise through this crate's safe typed
/// API, the same way `InvalidWriter`/`TypeMismatch` don't (see
/// `musli-json-core`'s `Error` doc comments); `no_utf8_coercion` is
/// preserved on [`Options`] for surface parity but is a no-op here.
pub(crate) fn append_string(sink: &mut dyn Sink, value: &str, opts: &Options) -> Result<(), Error> {
    sink.write_byte(b'"')?;

    if opts.string_escaping_disabled() {
        sink.write_bytes(value.as_bytes())?;
        return sink.write_byte(b'"');
    }

    let html_escaping = !opts.html_escaping_disabled();

    for ch in value.chars() {
        match ch {
            '"' => sink.write_bytes(b"\\\"")?,
            '\\' => sink.write_bytes(b"\\\\")?,
            '/' => sink.write_bytes(b"\\/")?,
            '\u{08}' => sink.write_bytes(b"\\b")?,
            '\u{0c}' => sink.write_bytes(b"\\f")?,
            '\n' => sink.write_bytes(b"\\n")?,
            '\r' => sink.write_bytes(b"\\r")?,
            '\t' => sink.write_bytes(b"\\t")?,
            c if (c as u32) < 0x20 => write_unicode_escape(sink, c as u32)?,
            '<' if html_escaping => write_unicode_escape(sink, '<' as u32)?,
            '>' if html_escaping => write_unicode_escape(sink, '>' as u32)?,
            '&' if html_escaping => write_unicode_escape(sink, '&' as u32)?,
            '\u{2028}' if html_escaping => write_unicode_escape(sink, 0x2028)?,
            '\u{2029}' if html_escaping => write_unicode_escape(sink, 0x2029)?,
            c => {
                let mut buf = [0u8; 4];
                sink.write_bytes(c.encode_utf8(&mut buf).as_bytes())?;
            }
        }
    }

    sink.write_byte(b'"')
}

const HEX_DIGITS: [u8; 16] = *b"0123456789abcdef";

fn write_unicode_escape(sink: &mut dyn Sink, code_point: u32) -> Result<(), Error> {
    let bytes = [
        b'\\',
        b'u',
        HEX_DIGITS[((code_point >> 12) & 0xf) as usize],
        HEX_DIGITS[((code_point >> 8) & 0xf) as usize],
        HEX_DIGITS[((code_point >> 4) & 0xf) as usize],
        HEX_DIGITS[(code_point & 0xf) as usize],
    ];
    sink.write_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_string(value: &str, opts: &Options) -> String {
        let mut buf = Vec::new();
        append_string(&mut buf, value, opts).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn escapes_the_full_fixture() {
        // Mirrors spec §8's string-escaping scenario: control characters
        // without a shortcut become `\u00XX`, `\b \f \n \r \t` use their
        // two-character shortcuts, `"` `\` `/` are always escaped, and a
        // non-ASCII letter outside the escape set passes through untouched.
        let opts = Options::new();
        let out = render_string("A\u{1}\"\\/\u{8}\u{c}\n\r\t\u{1ee}\u{2028}\u{2029}", &opts);
        assert_eq!(
            out,
            "\"A\\u0001\\\"\\\\\\/\\b\\f\\n\\r\\t\u{1ee}\\u2028\\u2029\""
        );
    }

    #[test]
    fn html_escaping_disabled_leaves_angle_brackets_raw() {
        let opts = Options::new().no_html_escaping(true);
        assert_eq!(render_string("<a>&", &opts), "\"<a>&\"");
    }

    #[test]
    fn no_string_escaping_writes_raw_bytes() {
        let opts = Options::new().no_string_escaping(true);
        assert_eq!(render_string("a\"b", &opts), "\"a\"b\"");
    }

    #[test]
    fn signed_base16_is_quoted() {
        let mut buf = Vec::new();
        append_signed(&mut buf, -1, 16).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "\"-1\"");
    }

    #[test]
    fn base_below_ten_is_unquoted() {
        let mut buf = Vec::new();
        append_signed(&mut buf, -5, 2).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "-101");
    }

    #[test]
    fn signed_base10_is_unquoted() {
        let mut buf = Vec::new();
        append_signed(&mut buf, i64::MAX as i128, 10).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "9223372036854775807");
    }

    #[test]
    fn float_rejects_nan_and_infinite() {
        let mut buf = Vec::new();
        assert!(append_f64(&mut buf, f64::NAN).is_err());
        assert!(append_f64(&mut buf, f64::INFINITY).is_err());
    }

    #[test]
    fn base64_round_trips_known_vector() {
        let mut buf = Vec::new();
        append_base64(&mut buf, b"Loreum").unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "\"TG9yZXVt\"");
    }

    #[test]
    fn base64_of_empty_input_is_empty_string() {
        let mut buf = Vec::new();
        append_base64(&mut buf, b"").unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "\"\"");
    }

    #[test]
    fn byte_array_renders_as_number_array() {
        let mut buf = Vec::new();
        append_byte_array(&mut buf, &[1, 2, 255]).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "[1,2,255]");
    }
}
