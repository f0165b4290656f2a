use alloc::vec::Vec;
use core::cmp;

/// Prefix sums over per-item extents along the scroll axis.
#[derive(Clone, Debug)]
pub(crate) struct Fenwick {
    tree: Vec<f64>, // 1-indexed
    total: f64,
    max_bit: usize,
}

impl Fenwick {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            tree: alloc::vec![0.0; n + 1],
            total: 0.0,
            max_bit: highest_power_of_two_leq(n),
        }
    }

    pub(crate) fn from_values(values: &[f64]) -> Self {
        let n = values.len();
        let mut tree = alloc::vec![0.0f64; n + 1];
        let mut total = 0.0f64;
        for i in 1..=n {
            let v = values[i - 1];
            total += v;
            tree[i] += v;
            let j = i + lsb(i);
            if j <= n {
                tree[j] += tree[i];
            }
        }
        Self {
            tree,
            total,
            max_bit: highest_power_of_two_leq(n),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tree.len().saturating_sub(1)
    }

    /// Sum of the first `count` values.
    pub(crate) fn prefix_sum(&self, count: usize) -> f64 {
        let mut i = cmp::min(count, self.len());
        let mut sum = 0.0f64;
        while i > 0 {
            sum += self.tree[i];
            i &= i - 1;
        }
        sum
    }

    pub(crate) fn total(&self) -> f64 {
        self.total
    }

    /// Returns the number of leading values whose prefix sum is `<= target`.
    ///
    /// `lower_bound(offset)` is the index of the item containing `offset` (unclamped).
    pub(crate) fn lower_bound(&self, target: f64) -> usize {
        self.search(target, |node, rest| node <= rest)
    }

    /// Returns the largest `k` with `prefix_sum(k) < target`.
    ///
    /// This is the index of the last item starting strictly before `target` (unclamped).
    pub(crate) fn count_before(&self, target: f64) -> usize {
        self.search(target, |node, rest| node < rest)
    }

    fn search(&self, mut target: f64, take: impl Fn(f64, f64) -> bool) -> usize {
        let n = self.len();
        let mut idx = 0usize;
        let mut bit = self.max_bit;
        while bit != 0 {
            let next = idx + bit;
            if next <= n && take(self.tree[next], target) {
                target -= self.tree[next];
                idx = next;
            }
            bit >>= 1;
        }
        idx
    }
}

fn lsb(i: usize) -> usize {
    i & i.wrapping_neg()
}

fn highest_power_of_two_leq(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let mut p = 1usize;
    while p <= n / 2 {
        p <<= 1;
    }
    p
}
