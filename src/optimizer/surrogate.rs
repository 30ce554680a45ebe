use super::TrainingSample;
use crate::util::euclidean;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub min_rf: f64,
    pub weight: f64,
    /// Mean normalised distance to the neighbours used.
    pub uncertainty: f64,
}

/// Inverse-distance-weighted k-nearest-neighbour predictor over the unit cube.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnnSurrogate {
    pub neighbors: usize,
    pub power: f64,
}

impl KnnSurrogate {
    pub fn new(neighbors: usize, power: f64) -> Self {
        Self {
            neighbors: neighbors.max(1),
            power,
        }
    }

    pub fn predict(&self, samples: &[TrainingSample], x: &[f64]) -> Option<Prediction> {
        if samples.is_empty() {
            return None;
        }
        let mut dists: Vec<(f64, &TrainingSample)> =
            samples.iter().map(|s| (euclidean(&s.x, x), s)).collect();
        dists.sort_by(|a, b| a.0.total_cmp(&b.0));
        dists.truncate(self.neighbors);

        let uncertainty = dists.iter().map(|(d, _)| d).sum::<f64>() / dists.len() as f64;

        if let Some(&(d, exact)) = dists.first() {
            if d < 1e-12 {
                return Some(Prediction {
                    min_rf: exact.min_rf,
                    weight: exact.weight,
                    uncertainty,
                });
            }
        }

        let mut wsum = 0.0;
        let mut rf = 0.0;
        let mut weight = 0.0;
        for (d, s) in &dists {
            let w = 1.0 / d.powf(self.power);
            wsum += w;
            rf += w * s.min_rf;
            weight += w * s.weight;
        }
        if !(wsum.is_finite() && wsum > 0.0) {
            return None;
        }
        Some(Prediction {
            min_rf: rf / wsum,
            weight: weight / wsum,
            uncertainty,
        })
    }
}

/// `weight × (1 + penalty × max(0, target − rf))`; lower is better.
pub fn penalised_fitness(weight: f64, min_rf: f64, target_rf: f64, penalty: f64) -> f64 {
    weight * (1.0 + penalty * (target_rf - min_rf).max(0.0))
}
