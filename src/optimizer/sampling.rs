use fastrand::Rng;

/// Latin hypercube sample of `n` points in the unit cube of `dim` dimensions:
/// every axis is split into `n` strata and each stratum is hit exactly once.
pub fn latin_hypercube(rng: &mut Rng, n: usize, dim: usize) -> Vec<Vec<f64>> {
    let mut points = vec![vec![0.0; dim]; n];
    if n == 0 {
        return points;
    }
    for d in 0..dim {
        let mut strata: Vec<usize> = (0..n).collect();
        rng.shuffle(&mut strata);
        for (point, stratum) in points.iter_mut().zip(strata) {
            point[d] = (stratum as f64 + rng.f64()) / n as f64;
        }
    }
    points
}

/// Latin hypercube sample inside the box `center ± radius`, clipped to the unit cube.
pub fn latin_hypercube_in_box(rng: &mut Rng, n: usize, center: &[f64], radius: f64) -> Vec<Vec<f64>> {
    latin_hypercube(rng, n, center.len())
        .into_iter()
        .map(|p| {
            p.iter()
                .zip(center)
                .map(|(&u, &c)| {
                    let lo = (c - radius).max(0.0);
                    let hi = (c + radius).min(1.0);
                    lo + u * (hi - lo)
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 3)]
    #[case(7, 2)]
    #[case(12, 5)]
    fn test_each_stratum_hit_once(#[case] n: usize, #[case] dim: usize) {
        let mut rng = Rng::with_seed(42);
        let pts = latin_hypercube(&mut rng, n, dim);
        assert_eq!(pts.len(), n);
        for d in 0..dim {
            let mut strata: Vec<usize> = pts.iter().map(|p| (p[d] * n as f64) as usize).collect();
            strata.sort_unstable();
            assert_eq!(strata, (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_box_sample_stays_inside_unit_cube() {
        let mut rng = Rng::with_seed(1);
        for p in latin_hypercube_in_box(&mut rng, 20, &[0.05, 0.95], 0.2) {
            assert!(p[0] >= 0.0 && p[0] <= 0.25);
            assert!(p[1] >= 0.75 && p[1] <= 1.0);
        }
    }
}
