//! SHA-256 backed identifiers for hash-addressed values.
//!
//! Parameter sets, process histories and parentages are deduplicated by a
//! digest of their canonical form; equal values always get equal ids.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

/// Incremental hasher producing one of the digest id types.
#[derive(Default)]
pub(crate) struct Hasher {
    inner: Sha256,
}

impl Hasher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Feeds a length-prefixed field so that adjacent fields cannot collide.
    pub(crate) fn field(&mut self, bytes: impl AsRef<[u8]>) -> &mut Self {
        let bytes = bytes.as_ref();
        self.inner.update((bytes.len() as u64).to_le_bytes());
        self.inner.update(bytes);
        self
    }

    pub(crate) fn finish(self) -> [u8; 32] {
        self.inner.finalize().into()
    }
}

macro_rules! digest_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        pub struct $name([u8; 32]);

        impl $name {
            pub(crate) fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Raw digest bytes.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// True unless this is the all-zero default id.
            pub fn is_valid(&self) -> bool {
                self.0 != [0u8; 32]
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for b in &self.0 {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.to_string()[..12])
            }
        }
    };
}

digest_id!(
    /// Identity of a [`ParameterSet`](crate::ParameterSet) (tracked entries only).
    ParameterSetID
);
digest_id!(
    /// Identity of a [`ProcessHistory`](crate::ProcessHistory).
    ProcessHistoryID
);
digest_id!(
    /// Identity of a [`Parentage`](crate::Parentage).
    ParentageID
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_boundaries_matter() {
        let mut a = Hasher::new();
        a.field("ab").field("c");
        let mut b = Hasher::new();
        b.field("a").field("bc");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn test_display_is_hex() {
        let mut h = Hasher::new();
        h.field("x");
        let id = ParentageID::from_bytes(h.finish());
        let s = id.to_string();
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(id.is_valid());
        assert!(!ParentageID::default().is_valid());
    }
}
