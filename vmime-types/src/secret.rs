//! Handling of secret values.
//!
//! This module provides a `Secret<T>` ensuring that sensitive values (SASL
//! responses, passwords) are not `Debug`-printed by accident.

use std::fmt::{Debug, Formatter};

/// A wrapper to ensure that secrets are redacted during `Debug`-printing.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct Secret<T>(T);

impl<T> Secret<T> {
    /// Create a new secret.
    pub fn new(inner: T) -> Self {
        Self(inner)
    }

    /// Expose the inner secret.
    pub fn declassify(&self) -> &T {
        &self.0
    }
}

impl<T> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T> Debug for Secret<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "/* REDACTED */")
    }
}

#[cfg(test)]
mod tests {
    use super::Secret;

    #[test]
    fn debug_never_leaks_the_secret() {
        let secret = Secret::new("xyz123".to_string());
        let got = format!("{:?}", secret);
        assert!(!got.contains("xyz123"));
        assert_eq!(got, "/* REDACTED */");
    }

    #[test]
    fn declassify_returns_the_inner_value() {
        let secret = Secret::new(42);
        assert_eq!(*secret.declassify(), 42);
    }
}
