//! String interning for entity names
//!
//! Qualified names repeat their whole scope prefix (`ns::Outer::Inner::method`),
//! so every distinct name is stored once and entities hold a 4-byte key.
//! The name index of the model is keyed by these keys, which is also how a
//! forward declaration and its later definition collapse onto one entity.

use lasso::{Spur, ThreadedRodeo};

/// A string key - small (4 bytes) reference to an interned string
pub type StrKey = Spur;

/// Thread-safe string interner; the frozen model is shared across analyzer threads
#[derive(Debug)]
pub struct StringInterner {
    inner: ThreadedRodeo,
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl StringInterner {
    pub fn new() -> Self {
        Self {
            inner: ThreadedRodeo::default(),
        }
    }

    /// Intern a string, returning the existing key if already present
    #[inline]
    pub fn intern(&self, s: &str) -> StrKey {
        self.inner.get_or_intern(s)
    }

    #[inline]
    pub fn resolve(&self, key: StrKey) -> &str {
        self.inner.resolve(&key)
    }

    /// Key for an already-interned string, without interning it
    #[inline]
    pub fn get(&self, s: &str) -> Option<StrKey> {
        self.inner.get(s)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
