//! Map key encoding precedence (spec §4.3): a map key is always emitted as a
//! quoted JSON string, but what string it turns into depends on the key
//! type. Built-in string/integer keys format directly; any other key type
//! must opt in via [`crate::marshal::TextMarshal`], probed through the same
//! dispatch mechanism as value marshaling.

use crate::encode::Encode;

/// A type that can be used as a JSON object key.
pub trait MapKey {
    /// Produce the string to emit as this key, or `None` if the key has no
    /// representation and should be silently dropped (see DESIGN.md's Open
    /// Question on nil text-marshaler keys).
    fn encode_key(&self) -> Option<String>;
}

impl MapKey for String {
    fn encode_key(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl MapKey for str {
    fn encode_key(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl MapKey for &str {
    fn encode_key(&self) -> Option<String> {
        Some((*self).to_string())
    }
}

macro_rules! int_map_key {
    ($($ty:ty),* $(,)?) => {
        $(
            impl MapKey for $ty {
                fn encode_key(&self) -> Option<String> {
                    Some(self.to_string())
                }
            }
        )*
    };
}

int_map_key!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, bool
);

/// Fallback used by the derive macro for key types with no built-in
/// [`MapKey`] impl: dispatches through [`crate::marshal::TextMarshal`] and
/// returns `None` (dropping the entry) if the type offers neither.
pub fn encode_key_via_marshal<T: Encode + ?Sized>(value: &T) -> Option<String> {
    match value.as_text_marshal() {
        Some(m) => m.marshal_text().ok(),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_keys_round_trip() {
        assert_eq!(String::from("a").encode_key(), Some("a".to_string()));
        assert_eq!(42i32.encode_key(), Some("42".to_string()));
        assert_eq!(true.encode_key(), Some("true".to_string()));
    }

    struct NoCapability;

    impl Encode for NoCapability {
        fn encode<E: crate::encode::Encoder>(&self, encoder: E) -> Result<E::Ok, crate::error::Error> {
            encoder.encode_null()
        }
    }

    #[test]
    fn unmarked_key_type_is_dropped() {
        assert_eq!(encode_key_via_marshal(&NoCapability), None);
    }
}
