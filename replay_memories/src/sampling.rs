use rand::seq::index;
use rand::Rng;

/// Class-balanced draw over several row classes.
///
/// Every class is expanded by repetition to the size of the largest class,
/// giving a pool where each class owns an equal share. Batches are drawn
/// uniformly from that pool without replacement, cycling through the pool
/// again whenever the batch is larger than it.
#[derive(Clone, Debug)]
pub struct BalancedDraw {
    class_sizes: Vec<usize>,
    expanded_class_len: usize,
}

impl BalancedDraw {
    /// Returns `None` if there are no classes or any class is empty.
    pub fn new(class_sizes: Vec<usize>) -> Option<Self> {
        if class_sizes.is_empty() || class_sizes.contains(&0) {
            return None;
        }
        let expanded_class_len = class_sizes.iter().copied().max()?;
        Some(Self {
            class_sizes,
            expanded_class_len,
        })
    }

    pub fn pool_len(&self) -> usize {
        self.expanded_class_len * self.class_sizes.len()
    }

    /// Number of times a row of `class` appears in the expanded pool, rounded up.
    pub fn repetitions(&self, class: usize) -> usize {
        self.expanded_class_len.div_ceil(self.class_sizes[class])
    }

    fn slot(&self, pool_index: usize) -> (usize, usize) {
        let class = pool_index / self.expanded_class_len;
        let row = (pool_index % self.expanded_class_len) % self.class_sizes[class];
        (class, row)
    }

    /// Draws exactly `batch_size` `(class, row)` pairs.
    pub fn draw<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Vec<(usize, usize)> {
        let pool_len = self.pool_len();
        let mut drawn = Vec::with_capacity(batch_size);
        while drawn.len() < batch_size {
            let take = (batch_size - drawn.len()).min(pool_len);
            drawn.extend(
                index::sample(rng, pool_len, take)
                    .into_iter()
                    .map(|i| self.slot(i)),
            );
        }
        drawn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn rejects_empty_classes() {
        assert!(BalancedDraw::new(vec![]).is_none());
        assert!(BalancedDraw::new(vec![3, 0, 1]).is_none());
    }

    #[test]
    fn scarce_classes_are_repeated() {
        let draw = BalancedDraw::new(vec![1, 10, 3]).unwrap();
        assert_eq!(draw.pool_len(), 30);
        assert_eq!(draw.repetitions(0), 10);
        assert_eq!(draw.repetitions(1), 1);
        assert_eq!(draw.repetitions(2), 4);

        let mut rng = StdRng::seed_from_u64(1);
        let batch = draw.draw(30, &mut rng);
        let mut per_class = [0; 3];
        for (class, row) in batch {
            assert!(row < [1, 10, 3][class]);
            per_class[class] += 1;
        }
        // a draw of the full pool takes every slot exactly once
        assert_eq!(per_class, [10, 10, 10]);
    }

    #[test]
    fn batches_larger_than_pool_are_filled() {
        let draw = BalancedDraw::new(vec![1, 1, 1]).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let batch = draw.draw(150, &mut rng);
        assert_eq!(batch.len(), 150);
        for class in 0..3 {
            assert_eq!(batch.iter().filter(|(c, _)| *c == class).count(), 50);
        }
    }

    #[test]
    fn proportions_converge_to_equal_shares() {
        let draw = BalancedDraw::new(vec![2, 500, 17]).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        let batch = draw.draw(30_000, &mut rng);
        for class in 0..3 {
            let share = batch.iter().filter(|(c, _)| *c == class).count() as f64 / 30_000.0;
            assert!((share - 1.0 / 3.0).abs() < 0.02, "class {class} share {share}");
        }
    }
}
