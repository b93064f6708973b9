//! Atom index newtype

use serde::{Deserialize, Serialize};

/// Index into an expanded or base atom array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct AtomIndex(pub u32);

impl AtomIndex {
    #[inline]
    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for AtomIndex {
    #[inline]
    fn from(index: usize) -> Self {
        AtomIndex(index as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        let a = AtomIndex::from(7usize);
        assert_eq!(a.as_usize(), 7);
        assert_eq!(format!("{:?}", a), "AtomIndex(7)");
        assert!(AtomIndex(2) < a);
    }
}
