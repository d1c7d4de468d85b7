//! Explicit byte-sequence wrappers.
//!
//! Go's `encoding/json` special-cases `[]byte` (base64 string) against
//! every other slice element type (JSON array) by runtime reflection on the
//! element's kind. Rust has neither runtime reflection nor stable
//! specialization, so a single blanket `Encode for [T]`/`Vec<T>` cannot
//! branch on `T == u8` (see the comment above that impl in
//! [`crate::encode`]) — exactly the gap `serde_bytes` exists to fill for
//! `serde`. [`Bytes`] and [`ByteBuf`] are this crate's equivalent: a field
//! declared with one of these types instead of `&[u8]`/`Vec<u8>` renders as
//! base64 (or a raw number array under [`crate::options::Options::raw_byte_slice`])
//! by default.

use std::any::TypeId;
use std::ops::Deref;

use crate::encode::{Encode, Encoder};
use crate::error::Error;
use crate::program::{Describe, Kind, ProgramNode};

/// A borrowed byte sequence that always encodes via [`Encoder::encode_bytes`]
/// (base64 by default), never as a JSON array of numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bytes<'a>(pub &'a [u8]);

impl<'a> Bytes<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self(bytes)
    }
}

impl<'a> Deref for Bytes<'a> {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        self.0
    }
}

impl<'a> From<&'a [u8]> for Bytes<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for Bytes<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Self(bytes.as_slice())
    }
}

impl<'a> Encode for Bytes<'a> {
    fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
        encoder.encode_bytes(self.0)
    }
}

impl<'a> Describe for Bytes<'a> {
    fn describe(_ancestors: &mut Vec<TypeId>) -> ProgramNode {
        ProgramNode::new("musli_json_core::bytes::Bytes", Kind::Bytes)
    }
}

/// An owned byte sequence that always encodes via [`Encoder::encode_bytes`]
/// (base64 by default), never as a JSON array of numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteBuf(pub Vec<u8>);

impl ByteBuf {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Deref for ByteBuf {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for ByteBuf {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Encode for ByteBuf {
    fn encode<E: Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
        encoder.encode_bytes(&self.0)
    }
}

impl Describe for ByteBuf {
    fn describe(_ancestors: &mut Vec<TypeId>) -> ProgramNode {
        ProgramNode::new("musli_json_core::bytes::ByteBuf", Kind::Bytes)
    }
}

/// Whether `bytes` is empty, for the `,omitempty`/`IsEmpty` contract (spec
/// §4.3); zero-length byte sequences are always empty, matching a
/// zero-length `[]byte`/`[N]byte` in the reference encoder.
impl<'a> crate::empty::IsEmpty for Bytes<'a> {
    fn is_empty_value(&self) -> bool {
        self.0.is_empty()
    }
}

impl crate::empty::IsEmpty for ByteBuf {
    fn is_empty_value(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_buf_describes_as_bytes() {
        let node = ByteBuf::describe(&mut Vec::new());
        assert!(matches!(node.kind, Kind::Bytes));
    }

    #[test]
    fn bytes_deref_to_slice() {
        let owned = vec![1u8, 2, 3];
        let borrowed = Bytes::new(&owned);
        assert_eq!(&*borrowed, &[1, 2, 3]);
    }
}
