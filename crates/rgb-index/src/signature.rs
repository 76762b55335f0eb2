//! Composition signatures - bitsets over component ids.
//!
//! A signature records which component types an entity currently has. The
//! index buckets entities by exact signature, and query masks are matched
//! against bucket signatures with word-wise bit operations.

use std::fmt;

use smallvec::SmallVec;

use crate::component::ComponentId;

const WORD_BITS: usize = u64::BITS as usize;

/// A growable set of component ids.
///
/// Trailing zero words are always trimmed, so two signatures holding the same
/// ids compare and hash equal regardless of how they were built.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Signature {
    words: SmallVec<[u64; 2]>,
}

impl Signature {
    /// The empty signature.
    #[must_use]
    pub fn new() -> Self {
        Self {
            words: SmallVec::new(),
        }
    }

    /// Build a signature from a list of ids.
    #[must_use]
    pub fn from_ids(ids: &[ComponentId]) -> Self {
        let mut signature = Self::new();
        for &id in ids {
            signature.insert(id);
        }
        signature
    }

    /// Set the bit for `id`. Returns `true` if it was not already set.
    pub fn insert(&mut self, id: ComponentId) -> bool {
        let (word, bit) = split(id);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let was_set = self.words[word] & bit != 0;
        self.words[word] |= bit;
        !was_set
    }

    /// Clear the bit for `id`. Returns `true` if it was set.
    pub fn remove(&mut self, id: ComponentId) -> bool {
        let (word, bit) = split(id);
        let Some(slot) = self.words.get_mut(word) else {
            return false;
        };
        let was_set = *slot & bit != 0;
        *slot &= !bit;
        self.trim();
        was_set
    }

    /// Check whether `id` is present.
    #[must_use]
    pub fn contains(&self, id: ComponentId) -> bool {
        let (word, bit) = split(id);
        self.words.get(word).is_some_and(|w| w & bit != 0)
    }

    /// `true` if every id in `other` is also in `self`.
    #[must_use]
    pub fn is_superset(&self, other: &Self) -> bool {
        other
            .words
            .iter()
            .enumerate()
            .all(|(i, &need)| self.word(i) & need == need)
    }

    /// `true` if `self` and `other` share no ids.
    #[must_use]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & b == 0)
    }

    /// Number of ids in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// `true` if no ids are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Iterate over the ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.words.iter().enumerate().flat_map(|(word_index, &word)| {
            let base = word_index * WORD_BITS;
            let mut bits = word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let tz = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(ComponentId::from_raw((base + tz) as u32))
            })
        })
    }

    fn word(&self, index: usize) -> u64 {
        self.words.get(index).copied().unwrap_or(0)
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

const fn split(id: ComponentId) -> (usize, u64) {
    let index = id.index();
    (index / WORD_BITS, 1u64 << (index % WORD_BITS))
}

impl FromIterator<ComponentId> for Signature {
    fn from_iter<I: IntoIterator<Item = ComponentId>>(iter: I) -> Self {
        let mut signature = Self::new();
        for id in iter {
            signature.insert(id);
        }
        signature
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.iter().map(ComponentId::as_raw))
            .finish()
    }
}
