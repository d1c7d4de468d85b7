//! A JSON encoder producing output that is byte-for-byte compatible with a
//! reference JSON encoder, built from compiled encoding programs rather than
//! per-call reflection (see [`encoding::Encoding`]/[`musli_json_core`]'s
//! module docs for the cache-identity guarantee this buys).
//!
//! ```
//! use musli_json::Encode;
//!
//! #[derive(Encode)]
//! struct Pet {
//!     name: String,
//!     #[musli_json(omit_empty)]
//!     nickname: Option<String>,
//! }
//!
//! let pet = Pet { name: "Laika".to_string(), nickname: None };
//! assert_eq!(musli_json::to_string(&pet).unwrap(), r#"{"name":"Laika"}"#);
//! ```

mod engine;
pub mod encoding;
mod writer;

pub use self::encoding::{to_sink, to_string, to_vec, Encoding};
pub use musli_json_core::{
    encode_value, ByteBuf, Bytes, Context, Describe, DurationFormat, Encode, EncodeFlatten,
    Encoder, Error, IoSink, IsEmpty, JsonMarshal, JsonWriter, JsonWriterCtx, Options, Sink,
    TextMarshal,
};
// Lives in the macro namespace, so this doesn't collide with the `Encode`
// trait re-exported above: `#[derive(Encode)]` resolves here, `T: Encode`
// resolves there.
pub use musli_json_macros::Encode;
