use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

/// An environment state that can be stored as a document and projected into
/// a fixed-shape model input.
pub trait State: Clone + Debug + Serialize + DeserializeOwned {
    /// Length of the vector returned by [`State::to_input`].
    const INPUT_LEN: usize;

    fn to_input(&self) -> Vec<f32>;
}

/// A member of a finite action set.
///
/// Action indices follow the sorted order of [`Action::ALL`], which keeps
/// them stable across processes no matter how `ALL` happens to be listed.
pub trait Action: 'static + Copy + Ord + Debug + Serialize + DeserializeOwned {
    const ALL: &'static [Self];

    fn ordered() -> Vec<Self> {
        let mut actions = Self::ALL.to_vec();
        actions.sort();
        actions.dedup();
        actions
    }

    fn count() -> usize {
        Self::ordered().len()
    }

    /// # Panics
    ///
    /// Panics if `self` is not listed in [`Action::ALL`].
    fn index(&self) -> usize {
        self.index_in(&Self::ordered())
            .unwrap_or_else(|| panic!("{self:?} is missing from Action::ALL"))
    }

    /// Position of `self` in an ordering previously returned by
    /// [`Action::ordered`], for callers indexing many actions at once.
    fn index_in(&self, ordered: &[Self]) -> Option<usize> {
        ordered.binary_search(self).ok()
    }

    fn from_index(index: usize) -> Option<Self> {
        Self::ordered().get(index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
    enum Move {
        Down,
        Left,
        Right,
    }

    impl Action for Move {
        const ALL: &'static [Self] = &[Move::Right, Move::Down, Move::Left];
    }

    #[test]
    fn indices_follow_sorted_order() {
        assert_eq!(Move::ordered(), vec![Move::Down, Move::Left, Move::Right]);
        assert_eq!(Move::Down.index(), 0);
        assert_eq!(Move::Right.index(), 2);
        assert_eq!(Move::from_index(1), Some(Move::Left));
        assert_eq!(Move::from_index(3), None);
        assert_eq!(Move::count(), 3);
    }

    #[test]
    fn precomputed_ordering_gives_the_same_indices() {
        let ordered = Move::ordered();
        for action in Move::ALL {
            assert_eq!(action.index_in(&ordered), Some(action.index()));
        }
        assert_eq!(Move::Left.index_in(&[Move::Down, Move::Right]), None);
    }
}
