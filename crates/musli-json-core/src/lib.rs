//! Core traits and runtime shared by `musli-json` and `musli-json-macros`:
//! the type descriptor/program model (C2–C4), the execution engine's
//! `Encoder`/`Encode` contract (C5), marshaler-capability dispatch (C7), and
//! the `Options`/`Error` types every caller interacts with (C6).
//!
//! This crate has no opinion on *how* bytes get written (that's
//! `musli-json`); it only defines *what* gets walked and *in what order*.

mod bytes;
mod context;
mod empty;
mod encode;
mod error;
mod fields;
mod key;
mod marshal;
mod options;
mod program;
mod sink;
pub mod time;

pub use self::bytes::{ByteBuf, Bytes};
pub use self::context::Context;
pub use self::empty::IsEmpty;
pub use self::encode::{
    encode_value, Encode, EncodeFlatten, Encoder, MapEncoder, SequenceEncoder, StructEncoder,
};
pub use self::error::Error;
pub use self::fields::{resolve_visible, Candidate};
pub use self::key::{encode_key_via_marshal, MapKey};
pub use self::marshal::{JsonMarshal, JsonWriter, JsonWriterCtx, TextMarshal};
pub use self::options::{DurationFormat, Options};
pub use self::program::{
    describe_child, resolve_struct_fields, visible_field_names, Describe, FieldMeta, FlagSet,
    Kind, ProgramCache, ProgramNode,
};
pub use self::sink::{IoSink, Sink};
