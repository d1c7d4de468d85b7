//! The execution engine (C5): concrete [`musli_json_core::Encoder`]/
//! [`SequenceEncoder`]/[`MapEncoder`]/[`StructEncoder`] implementations that
//! drive a [`Sink`] trait object. Grounded on the teacher's
//! `JsonEncoder<W>`/`JsonArrayEncoder<W>`/`JsonObjectEncoder<W>` split in
//! `en.rs`, adapted from a generic `W: Writer` parameter to the `&mut dyn
//! Sink` trait-object style this crate's core already commits to (see
//! `musli-json-core::Sink`'s doc comment for why).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use musli_json_core::{
    encode_value, Encode, Error, MapEncoder, Options, Sink, SequenceEncoder, StructEncoder,
};

use crate::writer;

/// Drives the emission of a single JSON value onto `sink`.
pub struct JsonEncoder<'s> {
    sink: &'s mut dyn Sink,
    opts: &'s Options,
}

impl<'s> JsonEncoder<'s> {
    pub fn new(sink: &'s mut dyn Sink, opts: &'s Options) -> Self {
        Self { sink, opts }
    }
}

impl<'s> musli_json_core::Encoder for JsonEncoder<'s> {
    type Ok = ();
    type EncodeSequence = JsonArrayEncoder<'s>;
    type EncodeMap = JsonObjectEncoder<'s>;
    type EncodeStruct = JsonObjectEncoder<'s>;

    fn options(&self) -> &Options {
        self.opts
    }

    fn encode_null(self) -> Result<Self::Ok, Error> {
        self.sink.write_bytes(b"null")
    }

    fn encode_bool(self, value: bool) -> Result<Self::Ok, Error> {
        writer::append_bool(self.sink, value)
    }

    fn encode_i8(self, value: i8) -> Result<Self::Ok, Error> {
        writer::append_signed(self.sink, value as i128, self.opts.integer_base_value())
    }
    fn encode_i16(self, value: i16) -> Result<Self::Ok, Error> {
        writer::append_signed(self.sink, value as i128, self.opts.integer_base_value())
    }
    fn encode_i32(self, value: i32) -> Result<Self::Ok, Error> {
        writer::append_signed(self.sink, value as i128, self.opts.integer_base_value())
    }
    fn encode_i64(self, value: i64) -> Result<Self::Ok, Error> {
        writer::append_signed(self.sink, value as i128, self.opts.integer_base_value())
    }
    fn encode_i128(self, value: i128) -> Result<Self::Ok, Error> {
        writer::append_signed(self.sink, value, self.opts.integer_base_value())
    }
    fn encode_u8(self, value: u8) -> Result<Self::Ok, Error> {
        writer::append_unsigned(self.sink, value as u128, self.opts.integer_base_value())
    }
    fn encode_u16(self, value: u16) -> Result<Self::Ok, Error> {
        writer::append_unsigned(self.sink, value as u128, self.opts.integer_base_value())
    }
    fn encode_u32(self, value: u32) -> Result<Self::Ok, Error> {
        writer::append_unsigned(self.sink, value as u128, self.opts.integer_base_value())
    }
    fn encode_u64(self, value: u64) -> Result<Self::Ok, Error> {
        writer::append_unsigned(self.sink, value as u128, self.opts.integer_base_value())
    }
    fn encode_u128(self, value: u128) -> Result<Self::Ok, Error> {
        writer::append_unsigned(self.sink, value, self.opts.integer_base_value())
    }
    fn encode_f32(self, value: f32) -> Result<Self::Ok, Error> {
        writer::append_f32(self.sink, value)
    }
    fn encode_f64(self, value: f64) -> Result<Self::Ok, Error> {
        writer::append_f64(self.sink, value)
    }
    fn encode_char(self, value: char) -> Result<Self::Ok, Error> {
        let mut buf = [0u8; 4];
        writer::append_string(self.sink, value.encode_utf8(&mut buf), self.opts)
    }
    fn encode_str(self, value: &str) -> Result<Self::Ok, Error> {
        writer::append_string(self.sink, value, self.opts)
    }

    fn encode_bytes(self, value: &[u8]) -> Result<Self::Ok, Error> {
        // Reached either via `Bytes`/`ByteBuf` (a slice-shaped byte
        // sequence, base64 by default) or via a plain `[u8; N]` array whose
        // `byte_array_as_string` flag routed it here (see `Encode for [T;
        // N]` in `musli-json-core`) — both default to base64, and
        // `raw_byte_slice` is the only thing that moves a slice off that
        // default.
        if self.opts.raw_byte_slice_enabled() {
            writer::append_byte_array(self.sink, value)
        } else {
            writer::append_base64(self.sink, value)
        }
    }

    fn encode_raw(self, bytes: &[u8]) -> Result<Self::Ok, Error> {
        self.sink.write_bytes(bytes)
    }

    fn encode_time(self, value: SystemTime) -> Result<Self::Ok, Error> {
        if self.opts.unix_timestamp_enabled() {
            let secs = match value.duration_since(UNIX_EPOCH) {
                Ok(d) => d.as_secs() as i64,
                Err(e) => -(e.duration().as_secs() as i64),
            };
            return writer::append_signed(self.sink, secs as i128, 10);
        }

        if !musli_json_core::time::year_in_range(value) {
            return Err(Error::unsupported_value(
                "time value's calendar year is outside 0..=9999",
            ));
        }

        let text = match self.opts.time_layout_text() {
            Some(layout) => musli_json_core::time::format_layout(value, layout),
            None => musli_json_core::time::format_rfc3339(value),
        };
        writer::append_string(self.sink, &text, self.opts)
    }

    fn encode_duration(self, value: Duration) -> Result<Self::Ok, Error> {
        let text = musli_json_core::time::format_duration(value, false, self.opts.duration_format_value());
        writer::append_string(self.sink, &text, self.opts)
    }

    fn encode_sequence(self, _len: Option<usize>) -> Result<Self::EncodeSequence, Error> {
        self.sink.write_byte(b'[')?;
        Ok(JsonArrayEncoder {
            sink: self.sink,
            opts: self.opts,
            first: true,
        })
    }

    fn encode_map(self, _len: Option<usize>) -> Result<Self::EncodeMap, Error> {
        self.sink.write_byte(b'{')?;
        Ok(JsonObjectEncoder {
            sink: self.sink,
            opts: self.opts,
            first: true,
        })
    }

    fn encode_struct(self, _len: usize) -> Result<Self::EncodeStruct, Error> {
        self.sink.write_byte(b'{')?;
        Ok(JsonObjectEncoder {
            sink: self.sink,
            opts: self.opts,
            first: true,
        })
    }
}

/// A JSON array in progress.
pub struct JsonArrayEncoder<'s> {
    sink: &'s mut dyn Sink,
    opts: &'s Options,
    first: bool,
}

impl<'s> SequenceEncoder for JsonArrayEncoder<'s> {
    type Ok = ();

    fn encode_element<T: Encode + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
        if !self.first {
            self.sink.write_byte(b',')?;
        }
        self.first = false;
        encode_value(value, JsonEncoder::new(&mut *self.sink, self.opts))
    }

    fn end(self) -> Result<Self::Ok, Error> {
        self.sink.write_byte(b']')
    }
}

/// A JSON object in progress: backs both [`MapEncoder`] (dynamic key/value
/// pairs) and [`StructEncoder`] (a fixed, compiled field set), same as the
/// teacher's single `JsonObjectEncoder<W>` backing both.
pub struct JsonObjectEncoder<'s> {
    sink: &'s mut dyn Sink,
    opts: &'s Options,
    first: bool,
}

impl<'s> JsonObjectEncoder<'s> {
    fn write_separator(&mut self) -> Result<(), Error> {
        if !self.first {
            self.sink.write_byte(b',')?;
        }
        self.first = false;
        Ok(())
    }

    /// Encode `value` into a scratch buffer, then re-emit those bytes as the
    /// (escaped) body of a JSON string — the `,string` struct tag (spec
    /// §4.3). Composite values (objects/arrays) are left unquoted, matching
    /// the reference encoder's no-op there.
    fn encode_quoted<V: Encode + ?Sized>(&mut self, value: &V) -> Result<(), Error> {
        let mut scratch: Vec<u8> = Vec::new();
        encode_value(value, JsonEncoder::new(&mut scratch, self.opts))?;

        match scratch.first() {
            Some(b'{') | Some(b'[') => self.sink.write_bytes(&scratch),
            _ => {
                let text = String::from_utf8(scratch)
                    .expect("this engine only ever writes valid UTF-8");
                writer::append_string(self.sink, &text, self.opts)
            }
        }
    }
}

impl<'s> MapEncoder for JsonObjectEncoder<'s> {
    type Ok = ();

    fn encode_entry<V: Encode + ?Sized>(&mut self, key: Option<&str>, value: &V) -> Result<(), Error> {
        let Some(key) = key else {
            return Ok(());
        };
        self.write_separator()?;
        writer::append_string(self.sink, key, self.opts)?;
        self.sink.write_byte(b':')?;
        encode_value(value, JsonEncoder::new(&mut *self.sink, self.opts))
    }

    fn end(self) -> Result<Self::Ok, Error> {
        self.sink.write_byte(b'}')
    }
}

impl<'s> StructEncoder for JsonObjectEncoder<'s> {
    type Ok = ();

    fn options(&self) -> &Options {
        self.opts
    }

    fn encode_field<V: Encode + ?Sized>(&mut self, name: &str, value: &V) -> Result<(), Error> {
        self.write_separator()?;
        writer::append_string(self.sink, name, self.opts)?;
        self.sink.write_byte(b':')?;
        encode_value(value, JsonEncoder::new(&mut *self.sink, self.opts))
    }

    fn encode_field_quoted<V: Encode + ?Sized>(&mut self, name: &str, value: &V) -> Result<(), Error> {
        self.write_separator()?;
        writer::append_string(self.sink, name, self.opts)?;
        self.sink.write_byte(b':')?;
        self.encode_quoted(value)
    }

    fn end(self) -> Result<Self::Ok, Error> {
        self.sink.write_byte(b'}')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<T: Encode + ?Sized>(value: &T, opts: &Options) -> String {
        let mut buf = Vec::new();
        encode_value(value, JsonEncoder::new(&mut buf, opts)).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn encodes_basics() {
        let opts = Options::new();
        assert_eq!(encode(&true, &opts), "true");
        assert_eq!(encode(&i64::MAX, &opts), "9223372036854775807");
        let nil: Option<Box<i32>> = None;
        assert_eq!(encode(&nil, &opts), "null");
    }

    #[test]
    fn integer_base_quotes_above_ten() {
        let opts = Options::new().integer_base(16);
        assert_eq!(encode(&(-1i8), &opts), "\"-1\"");
    }

    #[test]
    fn sequence_emits_commas_between_elements() {
        let opts = Options::new();
        assert_eq!(encode(&vec![1, 2, 3], &opts), "[1,2,3]");
    }

    #[test]
    fn map_sorts_keys_by_default() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert("c".to_string(), 3);
        map.insert("a".to_string(), 1);
        map.insert("b".to_string(), 2);
        let opts = Options::new();
        assert_eq!(encode(&map, &opts), "{\"a\":1,\"b\":2,\"c\":3}");
    }

    #[test]
    fn bytes_default_to_base64() {
        let bytes = musli_json_core::Bytes::new(b"Loreum");
        let opts = Options::new();
        assert_eq!(encode(&bytes, &opts), "\"TG9yZXVt\"");
    }

    #[test]
    fn fixed_byte_array_defaults_to_number_array() {
        let bytes: [u8; 3] = [1, 2, 255];
        let opts = Options::new();
        assert_eq!(encode(&bytes, &opts), "[1,2,255]");
    }

    #[test]
    fn byte_array_as_string_forces_base64() {
        let bytes: [u8; 6] = *b"Loreum";
        let opts = Options::new().byte_array_as_string(true);
        assert_eq!(encode(&bytes, &opts), "\"TG9yZXVt\"");
    }

    #[test]
    fn raw_byte_slice_forces_number_array() {
        let bytes = musli_json_core::Bytes::new(b"Loreum");
        let opts = Options::new().raw_byte_slice(true);
        assert_eq!(encode(&bytes, &opts), "[76,111,114,101,117,109]");
    }

    #[test]
    fn quoted_scalar_field_wraps_in_extra_quotes() {
        struct Holder;

        impl Encode for Holder {
            fn encode<E: musli_json_core::Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
                let mut st = musli_json_core::Encoder::encode_struct(encoder, 1)?;
                musli_json_core::StructEncoder::encode_field_quoted(&mut st, "n", &42i32)?;
                musli_json_core::StructEncoder::end(st)
            }
        }

        let opts = Options::new();
        assert_eq!(encode(&Holder, &opts), "{\"n\":\"42\"}");
    }

    #[test]
    fn epoch_time_renders_rfc3339() {
        let opts = Options::new();
        assert_eq!(encode(&UNIX_EPOCH, &opts), "\"1970-01-01T00:00:00Z\"");
    }

    #[test]
    fn time_outside_year_range_is_rejected() {
        let opts = Options::new();
        let far_future = UNIX_EPOCH + Duration::from_secs(86_400 * 365 * 298_000);
        let mut buf = Vec::new();
        assert!(encode_value(&far_future, JsonEncoder::new(&mut buf, &opts)).is_err());
    }

    #[test]
    fn unix_timestamp_option_renders_seconds() {
        let opts = Options::new().unix_timestamp(true);
        assert_eq!(
            encode(&(UNIX_EPOCH + Duration::from_secs(60)), &opts),
            "60"
        );
    }

    #[test]
    fn time_layout_option_overrides_rfc3339() {
        let opts = Options::new().time_layout("2006-01-02");
        assert_eq!(
            encode(&(UNIX_EPOCH + Duration::from_secs(1_709_641_696)), &opts),
            "\"2024-03-05\""
        );
    }
}
