//! Forward traversal over sparse field indices.
//!
//! Field indices are 1-based and may have gaps. A `Traversal` precomputes a
//! successor array indexed by raw field index so that `first_index`,
//! `next_index` and `last_index` are O(1). Internally `0` is the packed
//! "no successor" marker; the public API reports it as `None`.

use alloc::vec;
use alloc::vec::Vec;

/// An ascending sequence of field indices.
pub trait IndexSequence {
    /// Returns the smallest index, or None if the sequence is empty.
    fn first_index(&self) -> Option<usize>;

    /// Returns the index following `index`, or None if `index` is the last
    /// one or is not part of the sequence.
    fn next_index(&self, index: usize) -> Option<usize>;

    /// Returns the largest index, or None if the sequence is empty.
    fn last_index(&self) -> Option<usize>;

    /// Returns the number of indices.
    fn size(&self) -> usize;

    /// Iterates the indices in ascending order.
    fn indices(&self) -> Indices<'_, Self>
    where
        Self: Sized,
    {
        Indices {
            sequence: self,
            next: self.first_index(),
        }
    }

    /// Returns this sequence with every index shifted up by `by`.
    fn transpose(&self, by: usize) -> Transposed<'_, Self>
    where
        Self: Sized,
    {
        Transposed {
            sequence: self,
            by,
        }
    }
}

/// Iterator over an [`IndexSequence`].
pub struct Indices<'a, S: IndexSequence> {
    sequence: &'a S,
    next: Option<usize>,
}

impl<S: IndexSequence> Iterator for Indices<'_, S> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        self.next = self.sequence.next_index(current);
        Some(current)
    }
}

/// An [`IndexSequence`] shifted by a fixed offset.
pub struct Transposed<'a, S: IndexSequence> {
    sequence: &'a S,
    by: usize,
}

impl<S: IndexSequence> IndexSequence for Transposed<'_, S> {
    fn first_index(&self) -> Option<usize> {
        self.sequence.first_index().map(|i| i + self.by)
    }

    fn next_index(&self, index: usize) -> Option<usize> {
        if index <= self.by {
            return None;
        }
        self.sequence.next_index(index - self.by).map(|i| i + self.by)
    }

    fn last_index(&self) -> Option<usize> {
        self.sequence.last_index().map(|i| i + self.by)
    }

    fn size(&self) -> usize {
        self.sequence.size()
    }
}

/// Precomputed successor array over a set of indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Traversal {
    first: usize,
    last: usize,
    size: usize,
    /// `next[i - 1]` is the successor of `i`, or 0.
    next: Vec<usize>,
}

impl Traversal {
    /// An empty traversal.
    pub(crate) fn empty() -> Self {
        Self {
            first: 0,
            last: 0,
            size: 0,
            next: Vec::new(),
        }
    }

    /// Builds a traversal from indices in any order. Duplicates are ignored.
    /// Every index must be non-zero.
    pub(crate) fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut sorted: Vec<usize> = indices.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();
        debug_assert!(sorted.first().map_or(true, |&i| i > 0));

        let (first, last) = match (sorted.first(), sorted.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Self::empty(),
        };

        let mut next = vec![0; last];
        for pair in sorted.windows(2) {
            next[pair[0] - 1] = pair[1];
        }

        Self {
            first,
            last,
            size: sorted.len(),
            next,
        }
    }

    /// Returns true if `index` is part of the traversal.
    #[inline]
    pub(crate) fn contains(&self, index: usize) -> bool {
        index != 0 && index <= self.last && (index == self.last || self.next[index - 1] != 0)
    }
}

impl IndexSequence for Traversal {
    #[inline]
    fn first_index(&self) -> Option<usize> {
        (self.first != 0).then_some(self.first)
    }

    #[inline]
    fn next_index(&self, index: usize) -> Option<usize> {
        if index == 0 {
            return None;
        }
        match self.next.get(index - 1) {
            Some(&next) if next != 0 => Some(next),
            _ => None,
        }
    }

    #[inline]
    fn last_index(&self) -> Option<usize> {
        (self.last != 0).then_some(self.last)
    }

    #[inline]
    fn size(&self) -> usize {
        self.size
    }
}
