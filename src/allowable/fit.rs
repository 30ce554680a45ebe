use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper end of the physically sane thickness range for curve inversion.
pub const MAX_SANE_THICKNESS: f64 = 1000.0;

/// `allowable = a × thickness^b`, or the constant `a` when excluded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllowableFit {
    pub a: f64,
    pub b: f64,
    pub r2: f64,
    /// Valid (positive thickness, positive allowable) pairs seen for the unit.
    pub sample_count: usize,
    /// Points left after governing-family filtering, i.e. used by the regression.
    pub fit_points: usize,
    pub excluded: bool,
    pub reason: Option<ExclusionReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum ExclusionReason {
    #[strum(serialize = "too few points")]
    TooFewPoints,
    #[strum(serialize = "low r2")]
    LowCorrelation,
    #[strum(serialize = "flat curve")]
    FlatCurve,
    #[strum(serialize = "singular")]
    Singular,
}

impl AllowableFit {
    fn degenerate(mean: f64, r2: f64, sample_count: usize, fit_points: usize, reason: ExclusionReason) -> Self {
        Self {
            a: mean,
            b: 0.0,
            r2,
            sample_count,
            fit_points,
            excluded: true,
            reason: Some(reason),
        }
    }

    pub fn evaluate(&self, thickness: f64) -> f64 {
        if self.excluded || self.b == 0.0 {
            return self.a;
        }
        self.a * thickness.powf(self.b)
    }

    /// Thickness at which the allowable equals `|stress| × target_rf`.
    pub fn required_thickness(&self, stress: f64, target_rf: f64) -> Option<f64> {
        if self.excluded || self.b == 0.0 || self.a.is_nan() || self.a <= 0.0 {
            return None;
        }
        let need = stress.abs() * target_rf;
        if need.is_nan() || need <= 0.0 {
            return None;
        }
        let t = (need / self.a).powf(1.0 / self.b);
        if t.is_finite() && t > 0.0 && t < MAX_SANE_THICKNESS {
            Some(t)
        } else {
            None
        }
    }
}

/// One (thickness, allowable) observation, optionally tagged with the
/// cross-section family it was measured on.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePoint {
    pub thickness: f64,
    pub allowable: f64,
    pub element_type: Option<String>,
}

/// Fit a power law in log-log space with quality gating.
pub fn fit_power_law(points: &[SamplePoint], r2_threshold: f64, min_points: usize) -> AllowableFit {
    let valid: Vec<&SamplePoint> = points
        .iter()
        .filter(|p| p.thickness > 0.0 && p.allowable > 0.0 && p.thickness.is_finite() && p.allowable.is_finite())
        .collect();

    let sample_count = valid.len();
    let mean_all = mean(valid.iter().map(|p| p.allowable));

    if sample_count < min_points {
        return AllowableFit::degenerate(mean_all, 0.0, sample_count, 0, ExclusionReason::TooFewPoints);
    }

    let governing = governing_points(&valid);
    let fit_points = governing.len();
    let mean_gov = mean(governing.iter().map(|&(_, a)| a));

    if fit_points < 2 {
        return AllowableFit::degenerate(mean_gov, 0.0, sample_count, fit_points, ExclusionReason::TooFewPoints);
    }

    // ln(allowable) = ln(a) + b·ln(thickness)
    let n = fit_points as f64;
    let xs: Vec<f64> = governing.iter().map(|&(t, _)| t.ln()).collect();
    let ys: Vec<f64> = governing.iter().map(|&(_, a)| a.ln()).collect();
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;
    let sxx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
    let sxy: f64 = xs.iter().zip(&ys).map(|(x, y)| (x - mx) * (y - my)).sum();

    if sxx <= f64::EPSILON {
        return AllowableFit::degenerate(mean_gov, 0.0, sample_count, fit_points, ExclusionReason::Singular);
    }

    let b = sxy / sxx;
    let a = (my - b * mx).exp();
    if !a.is_finite() || !b.is_finite() {
        return AllowableFit::degenerate(mean_gov, 0.0, sample_count, fit_points, ExclusionReason::Singular);
    }

    // r² on the original values
    let ss_tot: f64 = governing.iter().map(|&(_, v)| (v - mean_gov).powi(2)).sum();
    let ss_res: f64 = governing
        .iter()
        .map(|&(t, v)| (v - a * t.powf(b)).powi(2))
        .sum();
    let r2 = if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res <= f64::EPSILON {
        1.0
    } else {
        0.0
    };

    if b.abs() < 1e-12 {
        return AllowableFit::degenerate(mean_gov, r2, sample_count, fit_points, ExclusionReason::FlatCurve);
    }
    if r2 < r2_threshold {
        return AllowableFit::degenerate(mean_gov, r2, sample_count, fit_points, ExclusionReason::LowCorrelation);
    }

    AllowableFit {
        a,
        b,
        r2,
        sample_count,
        fit_points,
        excluded: false,
        reason: None,
    }
}

/// When several cross-section families are mixed, keep the one with the
/// lowest mean allowable; then collapse repeated thicknesses to their
/// minimum allowable.
fn governing_points(valid: &[&SamplePoint]) -> Vec<(f64, f64)> {
    let mut families: BTreeMap<&str, Vec<&SamplePoint>> = BTreeMap::new();
    for p in valid {
        families
            .entry(p.element_type.as_deref().unwrap_or(""))
            .or_default()
            .push(p);
    }

    let chosen: Vec<&SamplePoint> = if families.len() > 1 {
        families
            .into_values()
            .min_by(|a, b| {
                let ma = mean(a.iter().map(|p| p.allowable));
                let mb = mean(b.iter().map(|p| p.allowable));
                ma.total_cmp(&mb)
            })
            .unwrap_or_default()
    } else {
        valid.to_vec()
    };

    let mut by_thickness: Vec<(f64, f64)> = Vec::new();
    let mut sorted = chosen;
    sorted.sort_by(|a, b| a.thickness.total_cmp(&b.thickness));
    for p in sorted {
        match by_thickness.last_mut() {
            Some(last) if (last.0 - p.thickness).abs() <= 1e-9 * p.thickness.max(1.0) => {
                last.1 = last.1.min(p.allowable);
            }
            _ => by_thickness.push((p.thickness, p.allowable)),
        }
    }
    by_thickness
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
