use std::collections::HashSet;

use crate::error::Error;

/// How a [`std::time::Duration`] is rendered by `AppendDuration` (spec
/// §4.1/§6 `DurationFormat`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurationFormat {
    /// `"1h2m3.004s"`-style cascading units, with sub-second magnitudes
    /// rendered in `ns`/`µs`/`ms` (the default).
    #[default]
    String,
    /// Total whole minutes as an integer.
    Minutes,
    /// Total whole seconds as an integer.
    Seconds,
    /// Total whole milliseconds as an integer.
    Milliseconds,
    /// Total whole microseconds as an integer.
    Microseconds,
    /// Total nanoseconds as an integer.
    Nanoseconds,
}

/// Per-call runtime options passed to [`crate::encode::Encoder`], corresponding
/// to component C6 of the design.
#[derive(Debug, Clone)]
pub struct Options {
    pub(crate) with_context: bool,
    pub(crate) time_layout: Option<String>,
    pub(crate) unix_timestamp: bool,
    pub(crate) duration_format: DurationFormat,
    pub(crate) integer_base: u32,
    pub(crate) unsorted_map: bool,
    pub(crate) nil_map_empty: bool,
    pub(crate) nil_slice_empty: bool,
    pub(crate) no_html_escaping: bool,
    pub(crate) no_string_escaping: bool,
    pub(crate) no_utf8_coercion: bool,
    pub(crate) byte_array_as_string: bool,
    pub(crate) raw_byte_slice: bool,
    pub(crate) with_fields: Option<HashSet<String>>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            with_context: false,
            time_layout: None,
            unix_timestamp: false,
            duration_format: DurationFormat::default(),
            integer_base: 10,
            unsorted_map: false,
            nil_map_empty: false,
            nil_slice_empty: false,
            no_html_escaping: false,
            no_string_escaping: false,
            no_utf8_coercion: false,
            byte_array_as_string: false,
            raw_byte_slice: false,
            with_fields: None,
        }
    }
}

impl Options {
    /// Construct the default option set: base-10 integers, sorted map keys,
    /// `nil` maps/slices encode as `null`, HTML-unsafe characters escaped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Thread a [`crate::context::Context`] value through marshalers that
    /// accept one (`WithContext` in the design).
    pub fn with_context(mut self, enabled: bool) -> Self {
        self.with_context = enabled;
        self
    }

    /// Render `AppendTime` values using the given layout string rather than
    /// RFC 3339.
    pub fn time_layout(mut self, layout: impl Into<String>) -> Self {
        self.time_layout = Some(layout.into());
        self
    }

    /// Render times as Unix timestamps (seconds since the epoch) instead of
    /// a textual layout.
    pub fn unix_timestamp(mut self, enabled: bool) -> Self {
        self.unix_timestamp = enabled;
        self
    }

    /// Select how `std::time::Duration` values are rendered.
    pub fn duration_format(mut self, format: DurationFormat) -> Self {
        self.duration_format = format;
        self
    }

    /// Select the base (2..=36) used to render integers. Bases above 10 are
    /// quoted, since JSON numbers aren't readable in those bases.
    pub fn integer_base(mut self, base: u32) -> Self {
        self.integer_base = base;
        self
    }

    /// Emit map entries in their natural (unsorted) iteration order instead
    /// of sorting keys.
    pub fn unsorted_map(mut self, enabled: bool) -> Self {
        self.unsorted_map = enabled;
        self
    }

    /// Encode an empty or absent map as `{}` rather than `null`.
    pub fn nil_map_empty(mut self, enabled: bool) -> Self {
        self.nil_map_empty = enabled;
        self
    }

    /// Encode an empty or absent slice as `[]` rather than `null`.
    pub fn nil_slice_empty(mut self, enabled: bool) -> Self {
        self.nil_slice_empty = enabled;
        self
    }

    /// Disable escaping of `<`, `>` and `&`, and of U+2028/U+2029.
    pub fn no_html_escaping(mut self, enabled: bool) -> Self {
        self.no_html_escaping = enabled;
        self
    }

    /// Disable all string escaping beyond the minimum JSON requires (quote,
    /// backslash, and control characters).
    pub fn no_string_escaping(mut self, enabled: bool) -> Self {
        self.no_string_escaping = enabled;
        self
    }

    /// Disable replacement of invalid UTF-8 byte sequences with U+FFFD.
    pub fn no_utf8_coercion(mut self, enabled: bool) -> Self {
        self.no_utf8_coercion = enabled;
        self
    }

    /// Render fixed-size byte arrays as base64 strings instead of arrays of
    /// numbers.
    pub fn byte_array_as_string(mut self, enabled: bool) -> Self {
        self.byte_array_as_string = enabled;
        self
    }

    /// Render byte slices as JSON arrays of numbers instead of base64
    /// strings.
    pub fn raw_byte_slice(mut self, enabled: bool) -> Self {
        self.raw_byte_slice = enabled;
        self
    }

    /// Restrict encoding to exactly the named top-level fields, in the given
    /// order where the type allows it.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Whether `name` is permitted by a configured `with_fields` whitelist.
    /// Returns `true` when no whitelist is set.
    pub fn allows_field(&self, name: &str) -> bool {
        match &self.with_fields {
            Some(fields) => fields.contains(name),
            None => true,
        }
    }

    /// The custom time layout set via [`Options::time_layout`], if any.
    pub fn time_layout_text(&self) -> Option<&str> {
        self.time_layout.as_deref()
    }

    /// Whether [`Options::with_context`] was explicitly enabled for this
    /// call. A [`crate::context::Context`] is always constructed and threaded
    /// through writer-with-context marshalers regardless of this flag — a
    /// `Context` borrows `&Options` and so can never be absent the way a
    /// `nil` ambient context could be in the reference encoder (spec §6:
    /// "`nil` is rejected"). The flag is kept for surface parity with that
    /// option and so a caller can tell whether they asked for it.
    pub fn context_enabled(&self) -> bool {
        self.with_context
    }

    /// Whether `AppendTime` should render unix-seconds instead of a layout.
    pub fn unix_timestamp_enabled(&self) -> bool {
        self.unix_timestamp
    }

    /// The active [`DurationFormat`].
    pub fn duration_format_value(&self) -> DurationFormat {
        self.duration_format
    }

    /// The active integer base (2..=36).
    pub fn integer_base_value(&self) -> u32 {
        self.integer_base
    }

    /// Whether map entries should skip key sorting.
    pub fn unsorted_map_enabled(&self) -> bool {
        self.unsorted_map
    }

    /// Whether a nil/absent map should render as `{}` instead of `null`.
    pub fn nil_map_empty_enabled(&self) -> bool {
        self.nil_map_empty
    }

    /// Whether a nil/absent slice should render as `[]` instead of `null`.
    pub fn nil_slice_empty_enabled(&self) -> bool {
        self.nil_slice_empty
    }

    /// Whether `<`, `>`, `&`, U+2028 and U+2029 escaping is disabled.
    pub fn html_escaping_disabled(&self) -> bool {
        self.no_html_escaping
    }

    /// Whether all escaping beyond the JSON minimum is disabled.
    pub fn string_escaping_disabled(&self) -> bool {
        self.no_string_escaping
    }

    /// Whether invalid-UTF-8 replacement-character coercion is disabled.
    pub fn utf8_coercion_disabled(&self) -> bool {
        self.no_utf8_coercion
    }

    /// Whether fixed-size byte arrays render as base64 strings.
    pub fn byte_array_as_string_enabled(&self) -> bool {
        self.byte_array_as_string
    }

    /// Whether byte slices render as JSON arrays of numbers instead of
    /// base64 strings.
    pub fn raw_byte_slice_enabled(&self) -> bool {
        self.raw_byte_slice
    }

    /// Fail fast on option combinations that can never be satisfied.
    pub fn validate(&self) -> Result<(), Error> {
        if !(2..=36).contains(&self.integer_base) {
            return Err(Error::invalid_option(format!(
                "integer base must be in 2..=36, got {}",
                self.integer_base
            )));
        }

        if self.unix_timestamp && self.time_layout.is_some() {
            return Err(Error::invalid_option(
                "unix_timestamp and time_layout are mutually exclusive",
            ));
        }

        if self.time_layout.as_deref() == Some("") {
            return Err(Error::invalid_option("time layout must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_validate() {
        Options::new().validate().unwrap();
    }

    #[test]
    fn rejects_out_of_range_base() {
        let err = Options::new().integer_base(1).validate().unwrap_err();
        assert!(err.to_string().contains("integer base"));
    }

    #[test]
    fn rejects_conflicting_time_options() {
        let err = Options::new()
            .unix_timestamp(true)
            .time_layout("2006-01-02")
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn rejects_empty_time_layout() {
        let err = Options::new().time_layout("").validate().unwrap_err();
        assert!(err.to_string().contains("time layout"));
    }

    #[test]
    fn with_fields_whitelist() {
        let opts = Options::new().with_fields(["a", "b"]);
        assert!(opts.allows_field("a"));
        assert!(!opts.allows_field("c"));
        assert!(Options::new().allows_field("anything"));
    }
}
