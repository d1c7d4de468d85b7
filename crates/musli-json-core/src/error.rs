use core::fmt;
use std::error;
use std::io;

/// An opaque error type produced by encoding.
///
/// The actual error is hidden behind [`ErrorKind`] so that it can evolve
/// without it being a breaking change to this crate.
pub struct Error {
    err: ErrorKind,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self { err: kind }
    }

    /// Construct an error indicating that a value could not be represented
    /// in the output format, such as a `NaN` or infinite float.
    pub fn unsupported_value(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedValue(message.into()))
    }

    /// Construct an error indicating that an option passed to an encoder was
    /// invalid, such as an integer base outside of `2..=36`.
    pub fn invalid_option(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOption(message.into()))
    }

    /// Construct an error wrapping a failure from a user-provided marshaler,
    /// preserving the marshaling type's name (spec §4.6/§6 `MarshalerError`).
    pub fn marshal(type_name: &'static str, err: Box<dyn error::Error + Send + Sync + 'static>) -> Self {
        Self::new(ErrorKind::Marshal {
            type_name,
            source: err,
        })
    }

    /// Construct the error returned for a `nil`/absent output sink (spec §6
    /// `ErrInvalidWriter`). Unreachable through this crate's own typed API
    /// (a Rust `&mut dyn Sink` reference can't be null); kept so the error
    /// taxonomy is complete for callers building their own dynamic front
    /// end over this crate, matching the reference encoder's surface.
    pub fn invalid_writer() -> Self {
        Self::new(ErrorKind::InvalidWriter)
    }

    /// Construct the error returned when a caller's value doesn't match the
    /// encoder's static type (spec §6 `TypeMismatchError`). Like
    /// [`Error::invalid_writer`], this is structurally unreachable through
    /// `Encoder<T>::encode` (the compiler rejects a mismatched `T` before any
    /// `Error` could be constructed), kept for API completeness.
    pub fn type_mismatch(expected: &'static str, got: &'static str) -> Self {
        Self::new(ErrorKind::TypeMismatch { expected, got })
    }

    /// Construct the error returned for a type this crate cannot encode at
    /// all (channels, functions, complex numbers; spec §4.3/§6
    /// `UnsupportedType`). In practice the derive macro's own trait bounds
    /// reject such fields at compile time (no `Encode`/`Describe` impl
    /// exists for a function pointer or channel type), which is this
    /// crate's equivalent of the reference encoder's "signaled at compile
    /// time" contract; kept for parity with the documented taxonomy.
    pub fn unsupported_type(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedType(name.into()))
    }

    /// Construct a custom, message-only error.
    pub fn message(message: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Message(message.to_string()))
    }

    /// The marshaling type's name, if this is a [`Error::marshal`] error.
    pub fn marshal_type(&self) -> Option<&'static str> {
        match &self.err {
            ErrorKind::Marshal { type_name, .. } => Some(type_name),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum ErrorKind {
    Io(io::Error),
    UnsupportedValue(String),
    UnsupportedType(String),
    InvalidOption(String),
    InvalidWriter,
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },
    Marshal {
        type_name: &'static str,
        source: Box<dyn error::Error + Send + Sync + 'static>,
    },
    Message(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.err {
            ErrorKind::Io(err) => err.fmt(f),
            ErrorKind::UnsupportedValue(message) => write!(f, "unsupported value: {message}"),
            ErrorKind::UnsupportedType(name) => write!(f, "unsupported type: {name}"),
            ErrorKind::InvalidOption(message) => write!(f, "invalid option: {message}"),
            ErrorKind::InvalidWriter => write!(f, "invalid writer: sink is nil"),
            ErrorKind::TypeMismatch { expected, got } => {
                write!(f, "type mismatch: expected {expected}, got {got}")
            }
            ErrorKind::Marshal { type_name, source } => {
                write!(f, "json: error calling MarshalJSON for type {type_name}: {source}")
            }
            ErrorKind::Message(message) => message.fmt(f),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.err, f)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.err {
            ErrorKind::Io(err) => Some(err),
            ErrorKind::Marshal { source, .. } => Some(&**source),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::new(ErrorKind::Io(err))
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Self::new(ErrorKind::Io(io::Error::new(
            io::ErrorKind::Other,
            "formatter error",
        )))
    }
}
