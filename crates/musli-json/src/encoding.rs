//! The public encoding facade (C4, C5, C6): [`Encoding`] ties a compiled
//! program cache to a concrete writer and a per-call [`Options`] set.
//! Mirrors the teacher's `Encoding<M>` in shape — a small value type that
//! configuration methods build up, then drive a `to_vec`/`to_string`/`encode`
//! call — minus the wire-format generic, since this crate only ever targets
//! one format.

use std::marker::PhantomData;

use musli_json_core::{encode_value, Describe, Encode as EncodeTrait, Error, FlagSet, Options, ProgramCache, Sink};

use crate::engine::JsonEncoder;

/// Encode `value` to a new `Vec<u8>` using the default [`Options`].
pub fn to_vec<T>(value: &T) -> Result<Vec<u8>, Error>
where
    T: EncodeTrait,
{
    Encoding::new().to_vec(value)
}

/// Encode `value` to a new `String` using the default [`Options`].
pub fn to_string<T>(value: &T) -> Result<String, Error>
where
    T: EncodeTrait,
{
    Encoding::new().to_string(value)
}

/// Encode `value` directly onto `sink` using the default [`Options`].
pub fn to_sink<T>(value: &T, sink: &mut dyn Sink) -> Result<(), Error>
where
    T: EncodeTrait,
{
    Encoding::new().encode(value, sink)
}

/// Drives one or more encode calls against a shared [`ProgramCache`] (C4):
/// every `T` this `Encoding` sees is described at most once, regardless of
/// how many values of that type are subsequently encoded through it.
///
/// Holding an `Encoding` across calls is the point — a fresh one per call
/// defeats the cache and is equivalent to never having one.
pub struct Encoding<T = ()> {
    programs: ProgramCache,
    options: Options,
    _marker: PhantomData<T>,
}

impl Encoding<()> {
    /// Construct an encoding with default [`Options`] and an empty program
    /// cache.
    pub fn new() -> Self {
        Self {
            programs: ProgramCache::new(),
            options: Options::default(),
            _marker: PhantomData,
        }
    }
}

impl Default for Encoding<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Encoding<T> {
    /// Replace the active [`Options`].
    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// The number of distinct `(type, flags)` programs compiled so far.
    pub fn compiled_program_count(&self) -> usize {
        self.programs.len()
    }

    /// Eagerly compile `V`'s program, rather than waiting for the first
    /// `encode`/`to_vec`/`to_string` call to trigger it (spec §4.5's
    /// "compile ahead of first use" use case — e.g. warming the cache for a
    /// type known to be hot before serving traffic).
    pub fn compile<V: Describe>(&self) -> std::sync::Arc<musli_json_core::ProgramNode> {
        self.programs.get_or_compile::<V>(active_flags(&self.options))
    }

    /// Encode `value` directly onto `sink`.
    pub fn encode<V>(&self, value: &V, sink: &mut dyn Sink) -> Result<(), Error>
    where
        V: EncodeTrait,
    {
        self.options.validate()?;
        encode_value(value, JsonEncoder::new(sink, &self.options))
    }

    /// Encode `value` to a new `Vec<u8>`.
    pub fn to_vec<V>(&self, value: &V) -> Result<Vec<u8>, Error>
    where
        V: EncodeTrait,
    {
        let mut buf = Vec::new();
        self.encode(value, &mut buf)?;
        Ok(buf)
    }

    /// Encode `value` to a new `String`.
    pub fn to_string<V>(&self, value: &V) -> Result<String, Error>
    where
        V: EncodeTrait,
    {
        let bytes = self.to_vec(value)?;
        // `JsonEncoder` only ever writes bytes it produced itself (escaped
        // strings, itoa/ryu output, ASCII punctuation), all valid UTF-8.
        Ok(String::from_utf8(bytes).expect("writer only emits valid UTF-8"))
    }
}

/// Derive the subset of [`Options`] that changes what a program compiles to
/// (spec §3's `FlagSet`), as opposed to options that only affect how an
/// already-compiled program's leaves are rendered at execution time.
fn active_flags(options: &Options) -> FlagSet {
    let mut flags = FlagSet::empty();
    if options.raw_byte_slice_enabled() {
        flags = flags.union(FlagSet::RAW_BYTE_SLICE);
    }
    if options.byte_array_as_string_enabled() {
        flags = flags.union(FlagSet::BYTE_ARRAY_AS_STRING);
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(musli_json_macros::Encode)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn to_vec_round_trips_a_struct() {
        let point = Point { x: 1, y: 2 };
        let out = to_vec(&point).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"x\":1,\"y\":2}");
    }

    #[test]
    fn compile_populates_the_shared_cache_once() {
        let encoding: Encoding = Encoding::new();
        encoding.compile::<Point>();
        encoding.compile::<Point>();
        assert_eq!(encoding.compiled_program_count(), 1);
    }

    #[test]
    fn to_string_matches_to_vec() {
        let point = Point { x: 3, y: 4 };
        let encoding: Encoding = Encoding::new();
        assert_eq!(encoding.to_string(&point).unwrap(), "{\"x\":3,\"y\":4}");
    }
}
