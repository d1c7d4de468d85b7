//! The execution engine's contract (C5): a visitor-style [`Encoder`] trait
//! that a concrete JSON writer implements, and the [`Encode`] trait that
//! every encodable value implements against it — either by hand (for the
//! primitive/collection types below) or via `#[derive(Encode)]`.
//!
//! Mirrors the teacher's `Encoder<C>`/`Encode` split, minus the `Context`/
//! `Mode` generics this crate has no use for (a single wire format, no
//! request-scoped allocator threading).

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};

use crate::error::Error;
use crate::marshal::{JsonMarshal, JsonWriter, JsonWriterCtx, TextMarshal};
use crate::options::Options;
use crate::program::{describe_child, Describe, Kind, ProgramNode};

/// Drives the emission of one JSON value. Each `encode_*` method consumes
/// `self`, since emitting a value is a one-shot operation; composite kinds
/// (`encode_map`/`encode_struct`/`encode_sequence`) return a child encoder
/// that owns the same underlying sink until its `end()` is called.
pub trait Encoder: Sized {
    /// What a finished encode produces; `()` for formats that only care
    /// about side effects on the sink (this crate's only concrete encoder).
    type Ok;
    type EncodeSequence: SequenceEncoder<Ok = Self::Ok>;
    type EncodeMap: MapEncoder<Ok = Self::Ok>;
    type EncodeStruct: StructEncoder<Ok = Self::Ok>;

    /// The options in effect for this encode call.
    fn options(&self) -> &Options;

    fn encode_null(self) -> Result<Self::Ok, Error>;
    fn encode_bool(self, value: bool) -> Result<Self::Ok, Error>;
    fn encode_i8(self, value: i8) -> Result<Self::Ok, Error>;
    fn encode_i16(self, value: i16) -> Result<Self::Ok, Error>;
    fn encode_i32(self, value: i32) -> Result<Self::Ok, Error>;
    fn encode_i64(self, value: i64) -> Result<Self::Ok, Error>;
    fn encode_i128(self, value: i128) -> Result<Self::Ok, Error>;
    fn encode_u8(self, value: u8) -> Result<Self::Ok, Error>;
    fn encode_u16(self, value: u16) -> Result<Self::Ok, Error>;
    fn encode_u32(self, value: u32) -> Result<Self::Ok, Error>;
    fn encode_u64(self, value: u64) -> Result<Self::Ok, Error>;
    fn encode_u128(self, value: u128) -> Result<Self::Ok, Error>;
    fn encode_f32(self, value: f32) -> Result<Self::Ok, Error>;
    fn encode_f64(self, value: f64) -> Result<Self::Ok, Error>;
    fn encode_char(self, value: char) -> Result<Self::Ok, Error>;
    fn encode_str(self, value: &str) -> Result<Self::Ok, Error>;
    /// Emit a byte slice, as either a base64 string or a number array
    /// depending on the active [`Options`].
    fn encode_bytes(self, value: &[u8]) -> Result<Self::Ok, Error>;
    /// Splice already-encoded, well-formed JSON bytes verbatim. Used by
    /// marshaler-capability dispatch (C7) to embed a value's own
    /// `JsonWriter`/`JsonMarshal` output.
    fn encode_raw(self, bytes: &[u8]) -> Result<Self::Ok, Error>;

    /// Emit a `std::time::SystemTime` leaf per the active `TimeLayout`/
    /// `UnixTimestamp` option (spec §4.1/§4.4).
    fn encode_time(self, value: std::time::SystemTime) -> Result<Self::Ok, Error>;
    /// Emit a `std::time::Duration` leaf per the active `DurationFormat`
    /// option (spec §4.1/§4.4).
    fn encode_duration(self, value: std::time::Duration) -> Result<Self::Ok, Error>;

    fn encode_sequence(self, len: Option<usize>) -> Result<Self::EncodeSequence, Error>;
    fn encode_map(self, len: Option<usize>) -> Result<Self::EncodeMap, Error>;
    fn encode_struct(self, len: usize) -> Result<Self::EncodeStruct, Error>;
}

/// Emits a homogeneous JSON array.
///
/// Implementations should route `value` through [`encode_value`] rather
/// than calling `value.encode()` directly, so marshaler-capability dispatch
/// (C7) applies at every nesting level, not just at the top-level call.
pub trait SequenceEncoder {
    type Ok;
    fn encode_element<T: Encode + ?Sized>(&mut self, value: &T) -> Result<(), Error>;
    fn end(self) -> Result<Self::Ok, Error>;
}

/// Emits a JSON object built from key/value pairs whose keys are not known
/// until encode time (a `HashMap`/`BTreeMap`, as opposed to a struct's fixed
/// field set).
pub trait MapEncoder {
    type Ok;
    /// Emit one entry, routing `value` through [`encode_value`]. `key` has
    /// already been reduced to its string form by [`crate::key::MapKey`];
    /// implementations write nothing if `key` is `None` (see DESIGN.md's
    /// Open Question on absent marshaled keys).
    fn encode_entry<V: Encode + ?Sized>(&mut self, key: Option<&str>, value: &V) -> Result<(), Error>;
    fn end(self) -> Result<Self::Ok, Error>;
}

/// Emits a JSON object with a fixed, statically-known field set.
pub trait StructEncoder {
    type Ok;
    /// The options in effect, so generated code can consult `with_fields`/
    /// omit-empty behavior while deciding which fields to write.
    fn options(&self) -> &Options;
    /// Emit one field, routing `value` through [`encode_value`].
    fn encode_field<V: Encode + ?Sized>(&mut self, name: &str, value: &V) -> Result<(), Error>;
    /// Emit one field whose value is quoted even though its natural JSON
    /// shape is a bare scalar (the `,string` struct tag). Composite values
    /// are unaffected; the default forwards to [`Self::encode_field`], since
    /// only a concrete writer knows how to re-quote scalar output.
    fn encode_field_quoted<V: Encode + ?Sized>(
        &mut self,
        name: &str,
        value: &V,
    ) -> Result<(), Error> {
        self.encode_field(name, value)
    }
    fn end(self) -> Result<Self::Ok, Error>;
}

/// A value that knows how to write itself through an [`Encoder`].
/// Implemented by hand below for primitives and standard collections, and
/// generated by `#[derive(Encode)]` for user structs/enums.
///
/// The four `as_*` methods are the marshaler-capability dispatch hooks
/// (C7): each defaults to `None`, and a type wanting one of the
/// capabilities overrides the matching method to return `Some(self)`. This
/// is deliberately an ordinary overridable trait method rather than the
/// autoref-on-a-wrapper-type trick [`crate::marshal`] used to build before
/// this rewrite — that trick only resolves correctly when the concrete type
/// is known at the point the probe is *written*, which is never true for a
/// helper generic over `T: Encode`, so it silently always reported "no
/// capability" no matter what `T` actually was. Routing the check through
/// `Encode`'s own vtable sidesteps the problem entirely: `T: Encode` is a
/// bound the caller already has, so ordinary trait dispatch does the right
/// thing per concrete `T`.
pub trait Encode {
    fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error>;

    /// See [`crate::marshal::JsonWriterCtx`]. Highest dispatch priority.
    fn as_json_writer_ctx(&self) -> Option<&dyn JsonWriterCtx> {
        None
    }
    /// See [`crate::marshal::JsonWriter`].
    fn as_json_writer(&self) -> Option<&dyn JsonWriter> {
        None
    }
    /// See [`crate::marshal::JsonMarshal`].
    fn as_json_marshal(&self) -> Option<&dyn JsonMarshal> {
        None
    }
    /// See [`crate::marshal::TextMarshal`]. Lowest dispatch priority.
    fn as_text_marshal(&self) -> Option<&dyn TextMarshal> {
        None
    }

    /// Spec §4.4's `NilSliceEmpty`: whether `Option<Self>::None` should
    /// render as `[]` rather than `null` when that option is set. Default
    /// `false`; overridden by the slice-shaped containers this crate uses as
    /// the idiomatic stand-in for Go's nilable slice (`Option<Vec<T>>`).
    fn nil_renders_as_empty_sequence() -> bool
    where
        Self: Sized,
    {
        false
    }

    /// Spec §4.4's `NilMapEmpty`: same as
    /// [`Encode::nil_renders_as_empty_sequence`] but for `{}`/map-shaped
    /// containers.
    fn nil_renders_as_empty_map() -> bool
    where
        Self: Sized,
    {
        false
    }
}

/// Implemented by `#[derive(Encode)]` for struct types, letting them be
/// used as `#[musli_json(flatten)]` fields (spec §4.3/§4.4): instead of
/// opening their own nested object, their fields splice directly into the
/// parent's. `seen` (names already claimed, shallowest-first) enforces the
/// ordinary dominance case; `visible` is the root struct's fully resolved
/// name set (from [`crate::visible_field_names`]) and is what actually hides
/// an ambiguous name from every candidate, since `seen` alone only tracks
/// write order and can't tell "nobody should win" from "whoever's first
/// wins" (spec §4.3, resolved by [`crate::fields::resolve_visible`]).
pub trait EncodeFlatten {
    fn encode_flatten<S: StructEncoder>(
        &self,
        into: &mut S,
        seen: &mut std::collections::HashSet<&'static str>,
        visible: &std::collections::HashSet<&'static str>,
    ) -> Result<(), Error>;
}

/// Entry point used by generated code and by this crate's own container
/// impls: runs marshaler-capability dispatch (C7, priority
/// writer-with-context > writer > JSON-marshal > text-marshal) before
/// falling back to `value.encode(encoder)`.
pub fn encode_value<T, E>(value: &T, encoder: E) -> Result<E::Ok, Error>
where
    T: Encode + ?Sized,
    E: Encoder,
{
    if let Some(writer) = value.as_json_writer_ctx() {
        let ctx = crate::context::Context::new(encoder.options());
        let mut buf = Vec::new();
        writer.write_json_ctx(&ctx, &mut buf)?;
        return encoder.encode_raw(&buf);
    }

    if let Some(writer) = value.as_json_writer() {
        let mut buf = Vec::new();
        writer.write_json(&mut buf)?;
        return encoder.encode_raw(&buf);
    }

    if let Some(marshal) = value.as_json_marshal() {
        let bytes = marshal
            .marshal_json()
            .map_err(|err| Error::marshal(std::any::type_name::<T>(), err))?;
        return encoder.encode_raw(&bytes);
    }

    if let Some(marshal) = value.as_text_marshal() {
        let text = marshal
            .marshal_text()
            .map_err(|err| Error::marshal(std::any::type_name::<T>(), err))?;
        return encoder.encode_str(&text);
    }

    value.encode(encoder)
}

macro_rules! leaf {
    ($ty:ty, $method:ident, $kind:expr) => {
        impl Encode for $ty {
            fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
                encoder.$method(*self)
            }
        }

        impl Describe for $ty {
            fn describe(_ancestors: &mut Vec<TypeId>) -> ProgramNode {
                ProgramNode::new(std::any::type_name::<$ty>(), $kind)
            }
        }
    };
}

leaf!(bool, encode_bool, Kind::Bool);
leaf!(i8, encode_i8, Kind::I8);
leaf!(i16, encode_i16, Kind::I16);
leaf!(i32, encode_i32, Kind::I32);
leaf!(i64, encode_i64, Kind::I64);
leaf!(i128, encode_i128, Kind::I128);
leaf!(u8, encode_u8, Kind::U8);
leaf!(u16, encode_u16, Kind::U16);
leaf!(u32, encode_u32, Kind::U32);
leaf!(u64, encode_u64, Kind::U64);
leaf!(u128, encode_u128, Kind::U128);
leaf!(f32, encode_f32, Kind::F32);
leaf!(f64, encode_f64, Kind::F64);
leaf!(char, encode_char, Kind::Char);

impl Encode for isize {
    fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
        encoder.encode_i64(*self as i64)
    }
}

impl Describe for isize {
    fn describe(_ancestors: &mut Vec<TypeId>) -> ProgramNode {
        ProgramNode::new("isize", Kind::I64)
    }
}

impl Encode for usize {
    fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
        encoder.encode_u64(*self as u64)
    }
}

impl Describe for usize {
    fn describe(_ancestors: &mut Vec<TypeId>) -> ProgramNode {
        ProgramNode::new("usize", Kind::U64)
    }
}

impl Encode for str {
    fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
        encoder.encode_str(self)
    }
}

impl Encode for String {
    fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
        encoder.encode_str(self.as_str())
    }
}

impl Describe for String {
    fn describe(_ancestors: &mut Vec<TypeId>) -> ProgramNode {
        ProgramNode::new("String", Kind::String)
    }
}

impl Encode for std::time::SystemTime {
    fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
        encoder.encode_time(*self)
    }
}

impl Describe for std::time::SystemTime {
    fn describe(_ancestors: &mut Vec<TypeId>) -> ProgramNode {
        ProgramNode::new("std::time::SystemTime", Kind::Time)
    }
}

impl Encode for std::time::Duration {
    fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
        encoder.encode_duration(*self)
    }
}

impl Describe for std::time::Duration {
    fn describe(_ancestors: &mut Vec<TypeId>) -> ProgramNode {
        ProgramNode::new("std::time::Duration", Kind::Duration)
    }
}

impl<T: Encode> Encode for Option<T> {
    fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
        match self {
            Some(value) => encode_value(value, encoder),
            None => {
                if T::nil_renders_as_empty_sequence() && encoder.options().nil_slice_empty_enabled()
                {
                    return encoder.encode_sequence(Some(0))?.end();
                }
                if T::nil_renders_as_empty_map() && encoder.options().nil_map_empty_enabled() {
                    return encoder.encode_map(Some(0))?.end();
                }
                encoder.encode_null()
            }
        }
    }
}

impl<T: Describe> Describe for Option<T> {
    fn describe(ancestors: &mut Vec<TypeId>) -> ProgramNode {
        let inner = describe_child::<T>(ancestors);
        ProgramNode::new(std::any::type_name::<Self>(), Kind::Option(Box::new(inner)))
    }
}

// Rust has no stable specialization, so a single blanket `Encode for [T]`
// cannot special-case `T = u8` the way Go's `encoding/json` special-cases
// `[]byte`: a concrete `impl Encode for [u8]` alongside this blanket one
// would be two overlapping impls for the same type and is rejected by the
// compiler outright, not merely redundant. Every element type, `u8`
// included, goes through the ordinary homogeneous-array path here; values
// that want Go's default base64 rendering use [`crate::bytes::Bytes`]/
// [`crate::bytes::ByteBuf`] (the same accommodation serde makes via the
// `serde_bytes` crate for the identical reason), or the derive macro's
// `#[musli_json(bytes)]` field attribute, which wires the field through
// those wrapper types automatically.
impl<T: Encode> Encode for Vec<T> {
    fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
        self.as_slice().encode(encoder)
    }

    fn nil_renders_as_empty_sequence() -> bool {
        true
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe(ancestors: &mut Vec<TypeId>) -> ProgramNode {
        let inner = describe_child::<T>(ancestors);
        ProgramNode::new(std::any::type_name::<Self>(), Kind::Slice(Box::new(inner)))
    }
}

impl<T: Encode> Encode for [T] {
    fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
        let mut seq = encoder.encode_sequence(Some(self.len()))?;
        for element in self {
            seq.encode_element(element)?;
        }
        seq.end()
    }
}

impl<T: Encode + 'static, const N: usize> Encode for [T; N] {
    fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
        // Spec §4.3: a fixed-size `[N]byte` array defaults to a JSON array
        // of numbers (the ordinary homogeneous-array path below), but the
        // `ByteArrayAsString` option forces base64 rendering instead. Rust
        // has no specialization to special-case `T = u8` in this blanket
        // impl at compile time (see the comment above `Encode for Vec<T>`),
        // so the check happens at runtime instead via `dyn Any` downcasting
        // — safe, and paid only for arrays, not every element.
        if encoder.options().byte_array_as_string_enabled() {
            if let Some(bytes) = (self as &dyn std::any::Any).downcast_ref::<[u8; N]>() {
                return encoder.encode_bytes(bytes);
            }
        }
        self.as_slice().encode(encoder)
    }
}

impl<T: Describe, const N: usize> Describe for [T; N] {
    fn describe(ancestors: &mut Vec<TypeId>) -> ProgramNode {
        let inner = describe_child::<T>(ancestors);
        ProgramNode::new(
            std::any::type_name::<Self>(),
            Kind::Array {
                element: Box::new(inner),
                len: N,
            },
        )
    }
}

impl<T: Encode + ?Sized> Encode for Box<T> {
    fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
        encode_value(self.as_ref(), encoder)
    }

    fn as_json_writer_ctx(&self) -> Option<&dyn JsonWriterCtx> {
        self.as_ref().as_json_writer_ctx()
    }
    fn as_json_writer(&self) -> Option<&dyn JsonWriter> {
        self.as_ref().as_json_writer()
    }
    fn as_json_marshal(&self) -> Option<&dyn JsonMarshal> {
        self.as_ref().as_json_marshal()
    }
    fn as_text_marshal(&self) -> Option<&dyn TextMarshal> {
        self.as_ref().as_text_marshal()
    }
}

impl<T: Describe> Describe for Box<T> {
    fn describe(ancestors: &mut Vec<TypeId>) -> ProgramNode {
        T::describe(ancestors)
    }
}

impl<T: Encode + ?Sized> Encode for &T {
    fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
        encode_value(*self, encoder)
    }

    fn as_json_writer_ctx(&self) -> Option<&dyn JsonWriterCtx> {
        (*self).as_json_writer_ctx()
    }
    fn as_json_writer(&self) -> Option<&dyn JsonWriter> {
        (*self).as_json_writer()
    }
    fn as_json_marshal(&self) -> Option<&dyn JsonMarshal> {
        (*self).as_json_marshal()
    }
    fn as_text_marshal(&self) -> Option<&dyn TextMarshal> {
        (*self).as_text_marshal()
    }
}

impl<K, V> Encode for HashMap<K, V>
where
    K: crate::key::MapKey,
    V: Encode,
{
    fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
        let needs_sort = !encoder.options().unsorted_map;
        encode_map(self.iter(), encoder, needs_sort)
    }

    fn nil_renders_as_empty_map() -> bool {
        true
    }
}

impl<K: Describe, V: Describe> Describe for HashMap<K, V> {
    fn describe(ancestors: &mut Vec<TypeId>) -> ProgramNode {
        let key = describe_child::<K>(ancestors);
        let value = describe_child::<V>(ancestors);
        ProgramNode::new(
            std::any::type_name::<Self>(),
            Kind::Map {
                key: Box::new(key),
                value: Box::new(value),
            },
        )
    }
}

impl<K, V> Encode for BTreeMap<K, V>
where
    K: crate::key::MapKey,
    V: Encode,
{
    fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
        // Already in key order; never needs re-sorting.
        encode_map(self.iter(), encoder, false)
    }

    fn nil_renders_as_empty_map() -> bool {
        true
    }
}

impl<K: Describe, V: Describe> Describe for BTreeMap<K, V> {
    fn describe(ancestors: &mut Vec<TypeId>) -> ProgramNode {
        let key = describe_child::<K>(ancestors);
        let value = describe_child::<V>(ancestors);
        ProgramNode::new(
            std::any::type_name::<Self>(),
            Kind::Map {
                key: Box::new(key),
                value: Box::new(value),
            },
        )
    }
}

fn encode_map<'a, K, V, I, E>(entries: I, encoder: E, needs_sort: bool) -> Result<E::Ok, Error>
where
    K: crate::key::MapKey + 'a,
    V: Encode + 'a,
    I: Iterator<Item = (&'a K, &'a V)>,
    E: Encoder,
{
    let mut pairs: Vec<(Option<String>, &V)> = entries
        .map(|(k, v)| (k.encode_key(), v))
        .collect();

    if needs_sort {
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
    }

    let mut map = encoder.encode_map(Some(pairs.len()))?;
    for (key, value) in &pairs {
        map.encode_entry(key.as_deref(), *value)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    // A minimal `Encoder` used only to exercise the blanket `Encode` impls
    // above without depending on the `musli-json` crate (would be a
    // circular dev-dependency). It renders a deliberately simplified,
    // JSON-ish textual form good enough to assert against in unit tests.
    struct RecordingEncoder<'a> {
        out: &'a RefCell<String>,
        opts: &'a Options,
    }

    impl<'a> RecordingEncoder<'a> {
        fn push(&self, s: &str) {
            self.out.borrow_mut().push_str(s);
        }
    }

    struct RecordingSeq<'a> {
        enc: RecordingEncoder<'a>,
        first: bool,
    }

    struct RecordingMap<'a> {
        enc: RecordingEncoder<'a>,
        first: bool,
    }

    struct RecordingStruct<'a> {
        enc: RecordingEncoder<'a>,
        first: bool,
    }

    impl<'a> Encoder for RecordingEncoder<'a> {
        type Ok = ();
        type EncodeSequence = RecordingSeq<'a>;
        type EncodeMap = RecordingMap<'a>;
        type EncodeStruct = RecordingStruct<'a>;

        fn options(&self) -> &Options {
            self.opts
        }

        fn encode_null(self) -> Result<Self::Ok, Error> {
            self.push("null");
            Ok(())
        }

        fn encode_bool(self, value: bool) -> Result<Self::Ok, Error> {
            self.push(if value { "true" } else { "false" });
            Ok(())
        }

        fn encode_i8(self, value: i8) -> Result<Self::Ok, Error> {
            self.push(&value.to_string());
            Ok(())
        }
        fn encode_i16(self, value: i16) -> Result<Self::Ok, Error> {
            self.push(&value.to_string());
            Ok(())
        }
        fn encode_i32(self, value: i32) -> Result<Self::Ok, Error> {
            self.push(&value.to_string());
            Ok(())
        }
        fn encode_i64(self, value: i64) -> Result<Self::Ok, Error> {
            self.push(&value.to_string());
            Ok(())
        }
        fn encode_i128(self, value: i128) -> Result<Self::Ok, Error> {
            self.push(&value.to_string());
            Ok(())
        }
        fn encode_u8(self, value: u8) -> Result<Self::Ok, Error> {
            self.push(&value.to_string());
            Ok(())
        }
        fn encode_u16(self, value: u16) -> Result<Self::Ok, Error> {
            self.push(&value.to_string());
            Ok(())
        }
        fn encode_u32(self, value: u32) -> Result<Self::Ok, Error> {
            self.push(&value.to_string());
            Ok(())
        }
        fn encode_u64(self, value: u64) -> Result<Self::Ok, Error> {
            self.push(&value.to_string());
            Ok(())
        }
        fn encode_u128(self, value: u128) -> Result<Self::Ok, Error> {
            self.push(&value.to_string());
            Ok(())
        }
        fn encode_f32(self, value: f32) -> Result<Self::Ok, Error> {
            self.push(&value.to_string());
            Ok(())
        }
        fn encode_f64(self, value: f64) -> Result<Self::Ok, Error> {
            self.push(&value.to_string());
            Ok(())
        }
        fn encode_char(self, value: char) -> Result<Self::Ok, Error> {
            self.push(&format!("\"{value}\""));
            Ok(())
        }
        fn encode_str(self, value: &str) -> Result<Self::Ok, Error> {
            self.push(&format!("\"{value}\""));
            Ok(())
        }
        fn encode_bytes(self, value: &[u8]) -> Result<Self::Ok, Error> {
            self.push(&format!("{value:?}"));
            Ok(())
        }
        fn encode_raw(self, bytes: &[u8]) -> Result<Self::Ok, Error> {
            self.push(&String::from_utf8_lossy(bytes));
            Ok(())
        }
        fn encode_time(self, value: std::time::SystemTime) -> Result<Self::Ok, Error> {
            self.push(&format!("\"{}\"", crate::time::format_rfc3339(value)));
            Ok(())
        }
        fn encode_duration(self, value: std::time::Duration) -> Result<Self::Ok, Error> {
            let text = crate::time::format_duration(value, false, self.opts.duration_format);
            self.push(&format!("\"{text}\""));
            Ok(())
        }

        fn encode_sequence(self, _len: Option<usize>) -> Result<Self::EncodeSequence, Error> {
            self.push("[");
            Ok(RecordingSeq {
                enc: self,
                first: true,
            })
        }

        fn encode_map(self, _len: Option<usize>) -> Result<Self::EncodeMap, Error> {
            self.push("{");
            Ok(RecordingMap {
                enc: self,
                first: true,
            })
        }

        fn encode_struct(self, _len: usize) -> Result<Self::EncodeStruct, Error> {
            self.push("{");
            Ok(RecordingStruct {
                enc: self,
                first: true,
            })
        }
    }

    impl<'a> SequenceEncoder for RecordingSeq<'a> {
        type Ok = ();
        fn encode_element<T: Encode + ?Sized>(&mut self, value: &T) -> Result<(), Error> {
            if !self.first {
                self.enc.push(",");
            }
            self.first = false;
            value.encode(RecordingEncoder {
                out: self.enc.out,
                opts: self.enc.opts,
            })
        }
        fn end(self) -> Result<Self::Ok, Error> {
            self.enc.push("]");
            Ok(())
        }
    }

    impl<'a> MapEncoder for RecordingMap<'a> {
        type Ok = ();
        fn encode_entry<V: Encode + ?Sized>(
            &mut self,
            key: Option<&str>,
            value: &V,
        ) -> Result<(), Error> {
            let Some(key) = key else { return Ok(()) };
            if !self.first {
                self.enc.push(",");
            }
            self.first = false;
            self.enc.push(&format!("\"{key}\":"));
            value.encode(RecordingEncoder {
                out: self.enc.out,
                opts: self.enc.opts,
            })
        }
        fn end(self) -> Result<Self::Ok, Error> {
            self.enc.push("}");
            Ok(())
        }
    }

    impl<'a> StructEncoder for RecordingStruct<'a> {
        type Ok = ();
        fn options(&self) -> &Options {
            self.enc.opts
        }
        fn encode_field<V: Encode + ?Sized>(&mut self, name: &str, value: &V) -> Result<(), Error> {
            if !self.first {
                self.enc.push(",");
            }
            self.first = false;
            self.enc.push(&format!("\"{name}\":"));
            value.encode(RecordingEncoder {
                out: self.enc.out,
                opts: self.enc.opts,
            })
        }
        fn end(self) -> Result<Self::Ok, Error> {
            self.enc.push("}");
            Ok(())
        }
    }

    fn render<T: Encode>(value: &T, opts: &Options) -> String {
        let out = RefCell::new(String::new());
        value
            .encode(RecordingEncoder { out: &out, opts })
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn scalars() {
        let opts = Options::default();
        assert_eq!(render(&true, &opts), "true");
        assert_eq!(render(&42i32, &opts), "42");
        assert_eq!(render(&"hi".to_string(), &opts), "\"hi\"");
    }

    #[test]
    fn option_and_vec() {
        let opts = Options::default();
        let none: Option<i32> = None;
        assert_eq!(render(&none, &opts), "null");
        assert_eq!(render(&Some(5i32), &opts), "5");
        assert_eq!(render(&vec![1, 2, 3], &opts), "[1,2,3]");
    }

    #[test]
    fn none_slice_or_map_renders_null_by_default_and_empty_shape_when_opted_in() {
        let none_vec: Option<Vec<i32>> = None;
        let none_map: Option<BTreeMap<String, i32>> = None;

        let default_opts = Options::default();
        assert_eq!(render(&none_vec, &default_opts), "null");
        assert_eq!(render(&none_map, &default_opts), "null");

        let slice_opts = Options::new().nil_slice_empty(true);
        assert_eq!(render(&none_vec, &slice_opts), "[]");
        assert_eq!(render(&none_map, &slice_opts), "null");

        let map_opts = Options::new().nil_map_empty(true);
        assert_eq!(render(&none_vec, &map_opts), "null");
        assert_eq!(render(&none_map, &map_opts), "{}");
    }

    #[test]
    fn btreemap_is_already_sorted() {
        let opts = Options::default();
        let mut map = BTreeMap::new();
        map.insert("b".to_string(), 2);
        map.insert("a".to_string(), 1);
        assert_eq!(render(&map, &opts), "{\"a\":1,\"b\":2}");
    }

    #[test]
    fn hashmap_sorts_by_default() {
        let opts = Options::default();
        let mut map = HashMap::new();
        map.insert("z".to_string(), 1);
        map.insert("a".to_string(), 2);
        assert_eq!(render(&map, &opts), "{\"a\":2,\"z\":1}");
    }

    struct HasWriter;

    impl JsonWriter for HasWriter {
        fn write_json(&self, sink: &mut dyn crate::sink::Sink) -> Result<(), Error> {
            sink.write_bytes(b"\"from-writer\"")
        }
    }

    impl Encode for HasWriter {
        fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
            encoder.encode_null()
        }
        fn as_json_writer(&self) -> Option<&dyn JsonWriter> {
            Some(self)
        }
    }

    #[test]
    fn encode_value_prefers_writer_capability_over_encode() {
        let opts = Options::default();
        let out = RefCell::new(String::new());
        encode_value(&HasWriter, RecordingEncoder { out: &out, opts: &opts }).unwrap();
        assert_eq!(out.into_inner(), "\"from-writer\"");
    }

    struct HasWriterCtx;

    impl crate::marshal::JsonWriterCtx for HasWriterCtx {
        fn write_json_ctx(
            &self,
            _ctx: &crate::context::Context<'_>,
            sink: &mut dyn crate::sink::Sink,
        ) -> Result<(), Error> {
            sink.write_bytes(b"\"from-writer-ctx\"")
        }
    }

    impl Encode for HasWriterCtx {
        fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
            encoder.encode_null()
        }
        fn as_json_writer_ctx(&self) -> Option<&dyn crate::marshal::JsonWriterCtx> {
            Some(self)
        }
        fn as_json_writer(&self) -> Option<&dyn JsonWriter> {
            // A type offering both capabilities always loses this one to
            // `as_json_writer_ctx` (spec §4.4's fixed priority order); this
            // impl exists purely so `priority_order_is_ctx_then_writer_then_json_then_text`
            // below can prove that.
            None
        }
    }

    #[test]
    fn encode_value_invokes_writer_ctx_capability() {
        let opts = Options::default();
        let out = RefCell::new(String::new());
        encode_value(&HasWriterCtx, RecordingEncoder { out: &out, opts: &opts }).unwrap();
        assert_eq!(out.into_inner(), "\"from-writer-ctx\"");
    }

    /// A value implementing every marshal capability at once, each tagged
    /// with which one ran, so dispatch order is directly observable.
    struct AllCapabilities;

    impl crate::marshal::JsonWriterCtx for AllCapabilities {
        fn write_json_ctx(
            &self,
            _ctx: &crate::context::Context<'_>,
            sink: &mut dyn crate::sink::Sink,
        ) -> Result<(), Error> {
            sink.write_bytes(b"\"ctx\"")
        }
    }
    impl JsonWriter for AllCapabilities {
        fn write_json(&self, sink: &mut dyn crate::sink::Sink) -> Result<(), Error> {
            sink.write_bytes(b"\"writer\"")
        }
    }
    impl JsonMarshal for AllCapabilities {
        fn marshal_json(&self) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
            Ok(b"\"marshal\"".to_vec())
        }
    }
    impl TextMarshal for AllCapabilities {
        fn marshal_text(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
            Ok("text".to_string())
        }
    }
    impl Encode for AllCapabilities {
        fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
            encoder.encode_null()
        }
        fn as_json_writer_ctx(&self) -> Option<&dyn crate::marshal::JsonWriterCtx> {
            Some(self)
        }
        fn as_json_writer(&self) -> Option<&dyn JsonWriter> {
            Some(self)
        }
        fn as_json_marshal(&self) -> Option<&dyn JsonMarshal> {
            Some(self)
        }
        fn as_text_marshal(&self) -> Option<&dyn TextMarshal> {
            Some(self)
        }
    }

    #[test]
    fn priority_order_is_ctx_then_writer_then_json_then_text() {
        let opts = Options::default();

        let out = RefCell::new(String::new());
        encode_value(&AllCapabilities, RecordingEncoder { out: &out, opts: &opts }).unwrap();
        assert_eq!(out.into_inner(), "\"ctx\"");

        struct NoCtx;
        impl JsonWriter for NoCtx {
            fn write_json(&self, sink: &mut dyn crate::sink::Sink) -> Result<(), Error> {
                sink.write_bytes(b"\"writer\"")
            }
        }
        impl JsonMarshal for NoCtx {
            fn marshal_json(&self) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
                Ok(b"\"marshal\"".to_vec())
            }
        }
        impl Encode for NoCtx {
            fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
                encoder.encode_null()
            }
            fn as_json_writer(&self) -> Option<&dyn JsonWriter> {
                Some(self)
            }
            fn as_json_marshal(&self) -> Option<&dyn JsonMarshal> {
                Some(self)
            }
        }

        let out = RefCell::new(String::new());
        encode_value(&NoCtx, RecordingEncoder { out: &out, opts: &opts }).unwrap();
        assert_eq!(out.into_inner(), "\"writer\"");

        struct JsonOnly;
        impl JsonMarshal for JsonOnly {
            fn marshal_json(&self) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
                Ok(b"\"marshal\"".to_vec())
            }
        }
        impl TextMarshal for JsonOnly {
            fn marshal_text(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
                Ok("text".to_string())
            }
        }
        impl Encode for JsonOnly {
            fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
                encoder.encode_null()
            }
            fn as_json_marshal(&self) -> Option<&dyn JsonMarshal> {
                Some(self)
            }
            fn as_text_marshal(&self) -> Option<&dyn TextMarshal> {
                Some(self)
            }
        }

        let out = RefCell::new(String::new());
        encode_value(&JsonOnly, RecordingEncoder { out: &out, opts: &opts }).unwrap();
        assert_eq!(out.into_inner(), "\"marshal\"");
    }
}
