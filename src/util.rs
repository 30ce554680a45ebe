use fastrand::Rng;

pub fn seeded_rng(seed: Option<u64>) -> Rng {
    match seed {
        Some(s) => Rng::with_seed(s),
        None => Rng::new(),
    }
}

/// Standard normal draw (Box–Muller).
pub fn gaussian(rng: &mut Rng) -> f64 {
    // Keep u1 off zero so ln() stays finite.
    let u1 = 1.0 - rng.f64();
    let u2 = rng.f64();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Multiplicative step `current × ratio`, with the ratio limited to
/// `[1 − max_step, 1 + max_step]`.
pub fn limited_step(current: f64, ratio: f64, max_step: f64) -> f64 {
    let ratio = if ratio.is_finite() { ratio } else { 1.0 };
    current * ratio.clamp(1.0 - max_step, 1.0 + max_step)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_moments() {
        let mut rng = seeded_rng(Some(7));
        let n = 20_000;
        let draws: Vec<f64> = (0..n).map(|_| gaussian(&mut rng)).collect();
        let mean = draws.iter().sum::<f64>() / n as f64;
        let var = draws.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {}", mean);
        assert!((var - 1.0).abs() < 0.05, "var {}", var);
    }

    #[test]
    fn test_limited_step_clamps_ratio() {
        assert!((limited_step(4.0, 2.0f64.sqrt(), 0.3) - 5.2).abs() < 1e-12);
        assert!((limited_step(4.0, 0.1, 0.3) - 2.8).abs() < 1e-12);
        assert_eq!(limited_step(4.0, f64::NAN, 0.3), 4.0);
    }
}
