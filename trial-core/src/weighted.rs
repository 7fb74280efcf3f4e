//! Weighted random selection.
//!
//! Spawn candidates and reward tables are stored as weighted lists. Selection
//! draws an integer in `[0, total_weight)` and walks the cumulative weights,
//! so the same RNG state always yields the same item.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// An item paired with its selection weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weighted<T> {
    /// The item.
    pub data: T,
    /// Relative weight. Zero-weight entries are never selected.
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl<T> Weighted<T> {
    /// Pair an item with a weight.
    #[must_use]
    pub fn new(data: T, weight: u32) -> Self {
        Self { data, weight }
    }
}

/// A list of weighted items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightedList<T> {
    entries: Vec<Weighted<T>>,
}

impl<T> Default for WeightedList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> WeightedList<T> {
    /// An empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A list holding a single item with weight 1.
    #[must_use]
    pub fn single(data: T) -> Self {
        Self {
            entries: vec![Weighted::new(data, 1)],
        }
    }

    /// Builder-style push.
    #[must_use]
    pub fn with(mut self, data: T, weight: u32) -> Self {
        self.push(data, weight);
        self
    }

    /// Append an item.
    pub fn push(&mut self, data: T, weight: u32) {
        self.entries.push(Weighted::new(data, weight));
    }

    /// Whether the list has no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Sum of all weights.
    #[must_use]
    pub fn total_weight(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.weight)).sum()
    }

    /// Iterate over the entries.
    pub fn iter(&self) -> impl Iterator<Item = &Weighted<T>> {
        self.entries.iter()
    }

    /// Draw one item. Returns `None` when the list is empty or every weight is zero.
    pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&T> {
        let total = self.total_weight();
        if total == 0 {
            return None;
        }
        let mut roll = rng.gen_range(0..total);
        for entry in &self.entries {
            let weight = u64::from(entry.weight);
            if roll < weight {
                return Some(&entry.data);
            }
            roll -= weight;
        }
        None
    }
}

impl<T> FromIterator<(T, u32)> for WeightedList<T> {
    fn from_iter<I: IntoIterator<Item = (T, u32)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(data, weight)| Weighted::new(data, weight))
                .collect(),
        }
    }
}

fn default_weight() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn empty_list_selects_nothing() {
        let list: WeightedList<u8> = WeightedList::new();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(list.select(&mut rng).is_none());
    }

    #[test]
    fn zero_weights_select_nothing() {
        let list = WeightedList::new().with("a", 0).with("b", 0);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(list.select(&mut rng).is_none());
    }

    #[test]
    fn zero_weight_entry_is_skipped() {
        let list = WeightedList::new().with("never", 0).with("always", 5);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(list.select(&mut rng), Some(&"always"));
        }
    }

    #[test]
    fn same_seed_same_sequence() {
        let list = WeightedList::new().with(1, 3).with(2, 1).with(3, 6);
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        let seq_a: Vec<_> = (0..32).map(|_| list.select(&mut a).copied()).collect();
        let seq_b: Vec<_> = (0..32).map(|_| list.select(&mut b).copied()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn heavier_items_win_more_often() {
        let list = WeightedList::new().with("rare", 1).with("common", 9);
        let mut rng = StdRng::seed_from_u64(3);
        let common = (0..2000)
            .filter(|_| list.select(&mut rng) == Some(&"common"))
            .count();
        assert!(common > 1500, "common drawn {common} times");
    }
}
