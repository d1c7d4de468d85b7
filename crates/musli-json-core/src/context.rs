use crate::options::Options;

/// Ambient state threaded through a [`crate::marshal::JsonWriterCtx`]
/// implementation, corresponding to the `WithContext` option (C6/C7). Kept
/// deliberately small: it exposes the active [`Options`] and nothing else,
/// since this crate has no request-scoped state (no tracing spans, no
/// cancellation tokens) to carry.
pub struct Context<'a> {
    opts: &'a Options,
}

impl<'a> Context<'a> {
    pub(crate) fn new(opts: &'a Options) -> Self {
        Self { opts }
    }

    /// The options in effect for the encode call that produced this context.
    pub fn options(&self) -> &Options {
        self.opts
    }
}
