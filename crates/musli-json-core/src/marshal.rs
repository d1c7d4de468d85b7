//! Marshaler-capability dispatch (C7): letting a value opt out of the usual
//! field-by-field [`crate::encode::Encode`] walk in favor of writing itself
//! directly, in priority order: writer-with-context, writer, JSON-bytes,
//! text-bytes.
//!
//! Rust has no runtime reflection and no stable specialization, so there is
//! no way to ask "does this concrete `T` *also* implement `JsonMarshal`?"
//! from inside code that is merely generic over `T: Encode` — the attempt
//! (autoref-on-a-wrapper-type, probed from a function parameterized over an
//! unconstrained `T`) resolves once, generically, when the helper function
//! itself is type-checked, so it can never special-case a T the helper
//! wasn't told about. Instead, the probe lives on [`crate::encode::Encode`]
//! itself, as four default methods that each return `None`; a type wanting
//! one of the capabilities below overrides the matching method to return
//! `Some(self)`. Dispatch through a generic `T: Encode` bound then resolves
//! normally, the same way any other trait method does — no specialization
//! required, because the capability check is now just an ordinary virtual
//! call through a bound the caller already has.
use crate::context::Context;
use crate::error::Error;
use crate::sink::Sink;

/// A value that writes itself directly to the output, given ambient
/// [`Context`]. Highest dispatch priority.
pub trait JsonWriterCtx {
    /// Write this value's JSON representation to `sink`.
    fn write_json_ctx(&self, ctx: &Context<'_>, sink: &mut dyn Sink) -> Result<(), Error>;
}

/// A value that writes itself directly to the output.
pub trait JsonWriter {
    /// Write this value's JSON representation to `sink`.
    fn write_json(&self, sink: &mut dyn Sink) -> Result<(), Error>;
}

/// A value that can marshal itself to a complete, already-encoded JSON
/// document (mirrors Go's `json.Marshaler`).
pub trait JsonMarshal {
    /// Produce this value's JSON representation.
    fn marshal_json(&self) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>>;
}

/// A value that can marshal itself to plain text, which is then emitted as
/// a quoted, escaped JSON string (mirrors Go's `encoding.TextMarshaler`).
pub trait TextMarshal {
    /// Produce this value's textual representation.
    fn marshal_text(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::Encode;

    struct Plain;

    impl Encode for Plain {
        fn encode<E: crate::encode::Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
            encoder.encode_null()
        }
    }

    struct HasMarshal;

    impl JsonMarshal for HasMarshal {
        fn marshal_json(&self) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
            Ok(b"\"marshaled\"".to_vec())
        }
    }

    impl Encode for HasMarshal {
        fn encode<E: crate::encode::Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
            encoder.encode_null()
        }
        fn as_json_marshal(&self) -> Option<&dyn JsonMarshal> {
            Some(self)
        }
    }

    struct HasText;

    impl TextMarshal for HasText {
        fn marshal_text(&self) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
            Ok("text".to_string())
        }
    }

    impl Encode for HasText {
        fn encode<E: crate::encode::Encoder>(&self, encoder: E) -> Result<E::Ok, Error> {
            encoder.encode_null()
        }
        fn as_text_marshal(&self) -> Option<&dyn TextMarshal> {
            Some(self)
        }
    }

    #[test]
    fn plain_value_has_no_capability() {
        let value = Plain;
        assert!(value.as_json_writer_ctx().is_none());
        assert!(value.as_json_writer().is_none());
        assert!(value.as_json_marshal().is_none());
        assert!(value.as_text_marshal().is_none());
    }

    #[test]
    fn json_marshal_is_detected() {
        let value = HasMarshal;
        assert!(value.as_json_marshal().is_some());
        assert!(value.as_text_marshal().is_none());
    }

    #[test]
    fn text_marshal_is_detected() {
        let value = HasText;
        assert!(value.as_text_marshal().is_some());
        assert!(value.as_json_marshal().is_none());
    }
}
