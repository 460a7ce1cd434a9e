//! Tests for candidate ranking, weights and seeded random choice

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};
    use tilemosaic::algorithm::selection::{
        RandomSelector, candidate_weights, diversity_penalty, rank_by_adjusted_distance,
    };

    // Tests equal seeds produce equal choice sequences
    // Verified by seeding from entropy
    #[test]
    fn test_selector_deterministic() {
        let weights = [0.1, 0.4, 0.2, 0.3];
        let mut a = RandomSelector::new(7);
        let mut b = RandomSelector::new(7);
        let first: Vec<usize> = (0..50).map(|_| a.weighted_choice(&weights)).collect();
        let second: Vec<usize> = (0..50).map(|_| b.weighted_choice(&weights)).collect();
        assert_eq!(first, second);
        assert!(first.iter().all(|&i| i < weights.len()));
    }

    // Tests an injected generator behaves like the seeded constructor
    // Verified by reseeding inside from_rng
    #[test]
    fn test_selector_from_rng() {
        let weights = [0.25, 0.25, 0.5];
        let mut seeded = RandomSelector::new(11);
        let mut injected = RandomSelector::from_rng(StdRng::seed_from_u64(11));
        let first: Vec<usize> = (0..50).map(|_| seeded.weighted_choice(&weights)).collect();
        let second: Vec<usize> = (0..50).map(|_| injected.weighted_choice(&weights)).collect();
        assert_eq!(first, second);

        let mut other = RandomSelector::from_rng(StdRng::seed_from_u64(12));
        let third: Vec<usize> = (0..50).map(|_| other.weighted_choice(&weights)).collect();
        assert_ne!(first, third);
    }

    // Tests zero-weight entries are never chosen
    // Verified by choosing uniformly
    #[test]
    fn test_weighted_choice_skips_zero_weights() {
        let mut selector = RandomSelector::new(1);
        for _ in 0..200 {
            assert_eq!(selector.weighted_choice(&[0.0, 1.0, 0.0]), 1);
        }
        assert_eq!(selector.weighted_choice(&[0.0, 0.0]), 0);
        assert_eq!(selector.weighted_choice(&[]), 0);
    }

    // Tests uniform choice stays within the slice
    // Verified by indexing past the end
    #[test]
    fn test_choose() {
        let mut selector = RandomSelector::new(3);
        let empty: [usize; 0] = [];
        assert_eq!(selector.choose(&empty), None);
        for _ in 0..100 {
            let picked = selector.choose(&[4, 5, 6]).unwrap();
            assert!((4..=6).contains(&picked));
        }
    }

    // Tests candidate weights are normalized and favour better ranks
    // Verified by using uniform weights
    #[test]
    fn test_candidate_weights() {
        let weights = candidate_weights(4);
        assert_eq!(weights.len(), 4);
        assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(weights.windows(2).all(|pair| pair[0] > pair[1]));
        // 1 : 1/1.5 ratio between the first two ranks
        assert!((weights[0] / weights[1] - 1.5).abs() < 1e-12);
        assert!(candidate_weights(0).is_empty());
    }

    // Tests the diversity penalty is relative to the most used tile
    // Verified by using absolute usage counts
    #[test]
    fn test_diversity_penalty() {
        assert!((diversity_penalty(5, 10, 1.0) - 50.0).abs() < 1e-12);
        assert!((diversity_penalty(10, 10, 0.5) - 50.0).abs() < 1e-12);
        assert!(diversity_penalty(0, 0, 1.0).abs() < 1e-12);
        assert!(diversity_penalty(3, 3, 0.0).abs() < 1e-12);
    }

    // Tests ranking by plain colour distance keeps pool order on ties
    // Verified by using an unstable sort
    #[test]
    fn test_rank_by_distance() {
        let colors = [[100, 0, 0], [0, 0, 0], [0, 0, 0], [10, 0, 0]];
        let ranked = rank_by_adjusted_distance([0, 0, 0], &colors, &[0, 0, 0, 0], 0.0);
        let order: Vec<usize> = ranked.iter().map(|&(i, _)| i).collect();
        assert_eq!(order, vec![1, 2, 3, 0]);
        assert!((ranked[2].1 - 10.0).abs() < 1e-12);
    }

    // Tests heavy usage pushes a close tile behind a fresh one
    // Verified by ignoring usage counts
    #[test]
    fn test_rank_with_diversity() {
        let colors = [[0, 0, 0], [20, 0, 0]];
        let plain = rank_by_adjusted_distance([0, 0, 0], &colors, &[10, 0], 0.0);
        assert_eq!(plain[0].0, 0);

        let diverse = rank_by_adjusted_distance([0, 0, 0], &colors, &[10, 0], 1.0);
        assert_eq!(diverse[0].0, 1);
        assert!((diverse[1].1 - 100.0).abs() < 1e-12);
    }
}
