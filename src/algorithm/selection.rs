//! Candidate ranking and seeded random choice for tile selection

use crate::io::configuration::{CANDIDATE_RANK_DECAY, DIVERSITY_PENALTY_SCALE};
use crate::math::color::{Color, color_distance};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Seeded random selector for reproducible stochastic choices
///
/// Owned by a tile pool; two pools built from the same seed make the same
/// sequence of choices.
#[derive(Debug, Clone)]
pub struct RandomSelector {
    rng: StdRng,
}

impl RandomSelector {
    /// Create a deterministic random selector
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Wrap an existing generator
    pub const fn from_rng(rng: StdRng) -> Self {
        Self { rng }
    }

    /// Generic weighted random selection
    ///
    /// Returns index into weights array using cumulative distribution.
    /// Weights need not be normalized.
    pub fn weighted_choice(&mut self, weights: &[f64]) -> usize {
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return 0;
        }

        let mut rand_val = self.rng.random::<f64>() * total;
        for (i, &weight) in weights.iter().enumerate() {
            rand_val -= weight;
            if rand_val <= 0.0 {
                return i;
            }
        }
        weights.len().saturating_sub(1)
    }

    /// Uniformly pick one element
    pub fn choose<T: Copy>(&mut self, items: &[T]) -> Option<T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.rng.random_range(0..items.len())).copied()
    }
}

/// Normalized preference weights for ranked candidates
///
/// Rank `i` (0 = best) gets `1 / (1 + 0.5 i)` before normalization, so
/// better matches are favoured while lower ranks stay possible.
pub fn candidate_weights(count: usize) -> Vec<f64> {
    let raw: Vec<f64> = (0..count)
        .map(|rank| 1.0 / CANDIDATE_RANK_DECAY.mul_add(rank as f64, 1.0))
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

/// Distance penalty for a tile used `usage` times
///
/// Relative to the most used tile so that a weight of 1.0 adds up to
/// 100, comparable to RGB distances (0 to ~441).
pub fn diversity_penalty(usage: usize, max_usage: usize, weight: f64) -> f64 {
    let max_usage = max_usage.max(1);
    (usage as f64 / max_usage as f64) * weight * DIVERSITY_PENALTY_SCALE
}

/// Rank tiles by colour distance plus diversity penalty, best first
///
/// Returns `(tile_index, adjusted_distance)` pairs. Equal distances keep
/// pool order.
pub fn rank_by_adjusted_distance(
    target: Color,
    colors: &[Color],
    usage_counts: &[usize],
    diversity_weight: f64,
) -> Vec<(usize, f64)> {
    let max_usage = usage_counts.iter().copied().max().unwrap_or(0);

    let mut ranked: Vec<(usize, f64)> = colors
        .iter()
        .enumerate()
        .map(|(i, &color)| {
            let distance = color_distance(target, color);
            if diversity_weight > 0.0 {
                let usage = usage_counts.get(i).copied().unwrap_or(0);
                (i, distance + diversity_penalty(usage, max_usage, diversity_weight))
            } else {
                (i, distance)
            }
        })
        .collect();

    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked
}
