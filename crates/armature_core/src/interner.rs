//! Global element name interner.
//!
//! Element names are compared and hashed on every key lookup, so they are
//! stored as compact [`Symbol`]s instead of owned strings. Interned names live
//! for the whole process.

use std::sync::LazyLock;

use lasso::{Spur, ThreadedRodeo};

static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::new);

/// Compact integer identifier of an interned name.
pub type Symbol = Spur;

/// Interns a name, returning the existing symbol if it was seen before.
#[inline]
pub fn intern(s: &str) -> Symbol {
    INTERNER.get_or_intern(s)
}

/// Returns the symbol of an already interned name without allocating.
#[inline]
#[must_use]
pub fn get(s: &str) -> Option<Symbol> {
    INTERNER.get(s)
}

/// Resolves a symbol back to its name.
#[inline]
#[must_use]
pub fn resolve(sym: Symbol) -> &'static str {
    INTERNER.resolve(&sym)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_and_resolve() {
        let s1 = intern("spine_01");
        let s2 = intern("spine_01");
        let s3 = intern("spine_02");

        assert_eq!(s1, s2);
        assert_ne!(s1, s3);

        assert_eq!(resolve(s1), "spine_01");
        assert_eq!(resolve(s3), "spine_02");
    }

    #[test]
    fn test_get() {
        let _ = intern("existing_bone");

        assert!(get("existing_bone").is_some());
        assert!(get("never_interned_bone").is_none());
    }
}
