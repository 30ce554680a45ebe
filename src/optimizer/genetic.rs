use crate::util::gaussian;
use fastrand::Rng;

/// Index of the fittest (lowest score) of `size` random picks.
pub fn tournament_select(rng: &mut Rng, scores: &[f64], size: usize) -> usize {
    let mut best = rng.usize(0..scores.len());
    for _ in 1..size.max(1) {
        let idx = rng.usize(0..scores.len());
        if scores[idx] < scores[best] {
            best = idx;
        }
    }
    best
}

/// BLX-α crossover in the unit cube.
pub fn blend_crossover(rng: &mut Rng, a: &[f64], b: &[f64], alpha: f64) -> Vec<f64> {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let (lo, hi) = if x < y { (x, y) } else { (y, x) };
            let span = hi - lo;
            let lo = lo - alpha * span;
            let hi = hi + alpha * span;
            (lo + rng.f64() * (hi - lo)).clamp(0.0, 1.0)
        })
        .collect()
}

/// Per-gene Gaussian mutation with probability `rate`, clamped to the unit cube.
pub fn gaussian_mutation(rng: &mut Rng, genes: &mut [f64], sigma: f64, rate: f64) {
    for g in genes.iter_mut() {
        if rng.f64() < rate {
            *g = (*g + sigma * gaussian(rng)).clamp(0.0, 1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tournament_with_full_field_picks_best() {
        let mut rng = Rng::with_seed(3);
        let scores = [5.0, 1.0, 3.0];
        let wins = (0..200)
            .filter(|_| tournament_select(&mut rng, &scores, 16) == 1)
            .count();
        assert!(wins > 190);
    }

    #[test]
    fn test_operators_stay_in_unit_cube() {
        let mut rng = Rng::with_seed(9);
        for _ in 0..500 {
            let mut child = blend_crossover(&mut rng, &[0.0, 1.0, 0.5], &[1.0, 0.9, 0.5], 0.5);
            gaussian_mutation(&mut rng, &mut child, 0.5, 1.0);
            assert!(child.iter().all(|g| (0.0..=1.0).contains(g)));
        }
    }
}
