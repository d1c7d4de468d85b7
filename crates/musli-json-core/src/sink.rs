use std::io;

use crate::error::Error;

/// A byte-oriented output. The execution engine (C5) is written against this
/// trait object rather than a generic writer parameter, so that a compiled
/// [`crate::program::ProgramNode`] stays independent of where its bytes end
/// up, which is what lets two calls for the same `(TypeId, FlagSet)` share
/// one cached program.
pub trait Sink {
    /// Append raw bytes, already valid for the output (e.g. pre-escaped
    /// UTF-8, or ASCII punctuation).
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error>;

    /// Append a single ASCII byte. Provided for callers emitting punctuation
    /// one character at a time; the default forwards to [`Sink::write_bytes`].
    fn write_byte(&mut self, byte: u8) -> Result<(), Error> {
        self.write_bytes(&[byte])
    }
}

impl Sink for Vec<u8> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

impl Sink for String {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        // Safety net rather than `unsafe`: the engine only ever writes bytes
        // it produced itself (ASCII punctuation, escaped strings, itoa/ryu
        // output), all of which are valid UTF-8 by construction.
        match std::str::from_utf8(bytes) {
            Ok(s) => {
                self.push_str(s);
                Ok(())
            }
            Err(_) => Err(Error::message("sink received non-UTF-8 bytes")),
        }
    }
}

/// Adapts any [`std::io::Write`] into a [`Sink`], for callers who want to
/// encode directly onto a file or socket rather than an in-memory buffer.
pub struct IoSink<W> {
    inner: W,
}

impl<W> IoSink<W> {
    /// Wrap a writer as a [`Sink`].
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Unwrap back into the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: io::Write> Sink for IoSink<W> {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.inner.write_all(bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_accumulates() {
        let mut buf = Vec::new();
        buf.write_bytes(b"hello").unwrap();
        buf.write_byte(b'!').unwrap();
        assert_eq!(buf, b"hello!");
    }

    #[test]
    fn string_sink_rejects_invalid_utf8() {
        let mut buf = String::new();
        assert!(buf.write_bytes(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn io_sink_forwards_to_writer() {
        let mut backing = Vec::new();
        {
            let mut sink = IoSink::new(&mut backing);
            sink.write_bytes(b"abc").unwrap();
        }
        assert_eq!(backing, b"abc");
    }
}
