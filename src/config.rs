use crate::error::{SizerError, SizerResult};
use clap::{parser::ValueSource, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Args, Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    #[command(flatten)]
    pub run: RunParams,
    #[command(flatten)]
    pub fit: FitParams,
    #[command(flatten)]
    pub stress_ratio: StressRatioParams,
    #[command(flatten)]
    pub decoupled: DecoupledParams,
    #[command(flatten)]
    pub efficiency: EfficiencyParams,
    #[command(flatten)]
    pub surrogate: SurrogateParams,
    #[command(flatten)]
    pub response_surface: ResponseSurfaceParams,
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParams {
    #[arg(long, default_value_t = 1.0)]
    pub target_rf: f64,
    #[arg(long, default_value_t = 0.05)]
    pub rf_tolerance: f64,
    #[arg(long, default_value_t = 50)]
    pub max_iterations: usize,
    /// Successful iterations without a new best before the run stalls (0 = off)
    #[arg(long, default_value_t = 10)]
    pub patience: usize,
    #[arg(long, default_value_t = false)]
    pub floor_lock: bool,
    /// Density used when a property's material cannot be resolved (kg/mm³)
    #[arg(long, default_value_t = 2.8e-6)]
    pub default_density: f64,
    /// Bar/skin centroid distance within which properties are coupled (model units)
    #[arg(long, default_value_t = 150.0)]
    pub search_distance: f64,
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            target_rf: 1.0,
            rf_tolerance: 0.05,
            max_iterations: 50,
            patience: 10,
            floor_lock: false,
            default_density: 2.8e-6,
            search_distance: 150.0,
            seed: None,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitParams {
    #[arg(long, default_value_t = 0.9)]
    pub r2_threshold: f64,
    #[arg(long, default_value_t = 3)]
    pub min_points: usize,
}

impl Default for FitParams {
    fn default() -> Self {
        Self {
            r2_threshold: 0.9,
            min_points: 3,
        }
    }
}

// === STRATEGY TUNING ===
// Empirical constants; none of these are derived from first principles.

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StressRatioParams {
    #[arg(long, default_value_t = 0.5)]
    pub fsd_alpha: f64,
    #[arg(long, default_value_t = 0.30)]
    pub fsd_max_step: f64,
    #[arg(long, default_value_t = 0.25)]
    pub proximity_alpha: f64,
    #[arg(long, default_value_t = 0.15)]
    pub proximity_max_step: f64,
}

impl Default for StressRatioParams {
    fn default() -> Self {
        Self {
            fsd_alpha: 0.5,
            fsd_max_step: 0.30,
            proximity_alpha: 0.25,
            proximity_max_step: 0.15,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoupledParams {
    /// Fraction of converged bars that ends the bar-only phase
    #[arg(long, default_value_t = 0.9)]
    pub bar_phase_threshold: f64,
}

impl Default for DecoupledParams {
    fn default() -> Self {
        Self {
            bar_phase_threshold: 0.9,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EfficiencyParams {
    /// Share of under-target properties updated per iteration
    #[arg(long, default_value_t = 0.3)]
    pub efficiency_update_fraction: f64,
    /// Skin nudge per unit of a neighbouring bar's RF deficit
    #[arg(long, default_value_t = 0.5)]
    pub efficiency_coupling: f64,
    #[arg(long, default_value_t = 0.3)]
    pub efficiency_learning_rate: f64,
    #[arg(long, default_value_t = 0.30)]
    pub efficiency_max_step: f64,
    #[arg(long, default_value_t = 0.15)]
    pub efficiency_reduction_step: f64,
}

impl Default for EfficiencyParams {
    fn default() -> Self {
        Self {
            efficiency_update_fraction: 0.3,
            efficiency_coupling: 0.5,
            efficiency_learning_rate: 0.3,
            efficiency_max_step: 0.30,
            efficiency_reduction_step: 0.15,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurrogateParams {
    /// Latin-hypercube samples before the first surrogate search (0 = 2n+1)
    #[arg(long, default_value_t = 0)]
    pub surrogate_initial_samples: usize,
    #[arg(long, default_value_t = 5)]
    pub surrogate_neighbors: usize,
    #[arg(long, default_value_t = 2.0)]
    pub surrogate_idw_power: f64,
    #[arg(long, default_value_t = 40)]
    pub surrogate_population: usize,
    #[arg(long, default_value_t = 30)]
    pub surrogate_generations: usize,
    #[arg(long, default_value_t = 3)]
    pub surrogate_tournament: usize,
    #[arg(long, default_value_t = 0.5)]
    pub surrogate_blend_alpha: f64,
    #[arg(long, default_value_t = 0.1)]
    pub surrogate_mutation_sigma: f64,
    #[arg(long, default_value_t = 0.2)]
    pub surrogate_mutation_rate: f64,
    /// Most-promising candidates re-evaluated per batch
    #[arg(long, default_value_t = 3)]
    pub surrogate_exploit: usize,
    /// Most-uncertain candidates re-evaluated per batch
    #[arg(long, default_value_t = 1)]
    pub surrogate_explore: usize,
    #[arg(long, default_value_t = 10.0)]
    pub surrogate_penalty: f64,
}

impl Default for SurrogateParams {
    fn default() -> Self {
        Self {
            surrogate_initial_samples: 0,
            surrogate_neighbors: 5,
            surrogate_idw_power: 2.0,
            surrogate_population: 40,
            surrogate_generations: 30,
            surrogate_tournament: 3,
            surrogate_blend_alpha: 0.5,
            surrogate_mutation_sigma: 0.1,
            surrogate_mutation_rate: 0.2,
            surrogate_exploit: 3,
            surrogate_explore: 1,
            surrogate_penalty: 10.0,
        }
    }
}

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponseSurfaceParams {
    /// Design-of-experiments size (0 = coefficient count + 2)
    #[arg(long, default_value_t = 0)]
    pub rsm_doe_samples: usize,
    /// Largest variable count for which interaction terms are fitted
    #[arg(long, default_value_t = 8)]
    pub rsm_interaction_limit: usize,
    #[arg(long, default_value_t = 0.25)]
    pub rsm_trust_radius: f64,
    #[arg(long, default_value_t = 0.01)]
    pub rsm_min_radius: f64,
    #[arg(long, default_value_t = 0.5)]
    pub rsm_max_radius: f64,
    #[arg(long, default_value_t = 2.0)]
    pub rsm_grow: f64,
    #[arg(long, default_value_t = 0.5)]
    pub rsm_shrink: f64,
    /// Relative prediction error above which the surface is refitted
    #[arg(long, default_value_t = 0.1)]
    pub rsm_error_threshold: f64,
    #[arg(long, default_value_t = 100.0)]
    pub rsm_penalty: f64,
    #[arg(long, default_value_t = 200)]
    pub rsm_qp_iterations: usize,
}

impl Default for ResponseSurfaceParams {
    fn default() -> Self {
        Self {
            rsm_doe_samples: 0,
            rsm_interaction_limit: 8,
            rsm_trust_radius: 0.25,
            rsm_min_radius: 0.01,
            rsm_max_radius: 0.5,
            rsm_grow: 2.0,
            rsm_shrink: 0.5,
            rsm_error_threshold: 0.1,
            rsm_penalty: 100.0,
            rsm_qp_iterations: 200,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> SizerResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> SizerResult<()> {
        let r = &self.run;
        if !(r.target_rf.is_finite() && r.target_rf > 0.0) {
            return Err(SizerError::Config(format!(
                "target_rf must be positive, got {}",
                r.target_rf
            )));
        }
        if !(r.rf_tolerance.is_finite() && r.rf_tolerance >= 0.0) {
            return Err(SizerError::Config(format!(
                "rf_tolerance must be non-negative, got {}",
                r.rf_tolerance
            )));
        }
        if !(r.default_density.is_finite() && r.default_density > 0.0) {
            return Err(SizerError::Config(format!(
                "default_density must be positive, got {}",
                r.default_density
            )));
        }
        if !(r.search_distance.is_finite() && r.search_distance >= 0.0) {
            return Err(SizerError::Config(format!(
                "search_distance must be non-negative, got {}",
                r.search_distance
            )));
        }
        if !(0.0..=1.0).contains(&self.fit.r2_threshold) {
            return Err(SizerError::Config(format!(
                "r2_threshold must lie in [0, 1], got {}",
                self.fit.r2_threshold
            )));
        }
        let steps = [
            ("fsd_max_step", self.stress_ratio.fsd_max_step),
            ("proximity_max_step", self.stress_ratio.proximity_max_step),
            ("efficiency_max_step", self.efficiency.efficiency_max_step),
            (
                "efficiency_reduction_step",
                self.efficiency.efficiency_reduction_step,
            ),
        ];
        for (name, v) in steps {
            if !(v > 0.0 && v < 1.0) {
                return Err(SizerError::Config(format!(
                    "{} must lie in (0, 1), got {}",
                    name, v
                )));
            }
        }
        let rs = &self.response_surface;
        if !(rs.rsm_min_radius > 0.0 && rs.rsm_min_radius <= rs.rsm_max_radius) {
            return Err(SizerError::Config(
                "rsm_min_radius must be positive and not exceed rsm_max_radius".to_string(),
            ));
        }
        if !(rs.rsm_shrink > 0.0 && rs.rsm_shrink < 1.0) {
            return Err(SizerError::Config(format!(
                "rsm_shrink must lie in (0, 1), got {}",
                rs.rsm_shrink
            )));
        }
        if !(rs.rsm_grow.is_finite() && rs.rsm_grow >= 1.0) {
            return Err(SizerError::Config(format!(
                "rsm_grow must be at least 1, got {}",
                rs.rsm_grow
            )));
        }
        Ok(())
    }

    /// Overlay options typed explicitly on the command line onto a file config.
    pub fn merge_from_cli(&mut self, cli: &Config, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($($field:ident).+, $arg_name:expr) => {
                if matches.value_source($arg_name) == Some(ValueSource::CommandLine) {
                    self.$($field).+ = cli.$($field).+.clone();
                }
            };
        }

        update_if_present!(run.target_rf, "target_rf");
        update_if_present!(run.rf_tolerance, "rf_tolerance");
        update_if_present!(run.max_iterations, "max_iterations");
        update_if_present!(run.patience, "patience");
        update_if_present!(run.floor_lock, "floor_lock");
        update_if_present!(run.default_density, "default_density");
        update_if_present!(run.search_distance, "search_distance");
        update_if_present!(run.seed, "seed");

        update_if_present!(fit.r2_threshold, "r2_threshold");
        update_if_present!(fit.min_points, "min_points");

        update_if_present!(stress_ratio.fsd_alpha, "fsd_alpha");
        update_if_present!(stress_ratio.fsd_max_step, "fsd_max_step");
        update_if_present!(stress_ratio.proximity_alpha, "proximity_alpha");
        update_if_present!(stress_ratio.proximity_max_step, "proximity_max_step");

        update_if_present!(decoupled.bar_phase_threshold, "bar_phase_threshold");

        update_if_present!(efficiency.efficiency_update_fraction, "efficiency_update_fraction");
        update_if_present!(efficiency.efficiency_coupling, "efficiency_coupling");
        update_if_present!(efficiency.efficiency_learning_rate, "efficiency_learning_rate");
        update_if_present!(efficiency.efficiency_max_step, "efficiency_max_step");
        update_if_present!(efficiency.efficiency_reduction_step, "efficiency_reduction_step");

        update_if_present!(surrogate.surrogate_initial_samples, "surrogate_initial_samples");
        update_if_present!(surrogate.surrogate_neighbors, "surrogate_neighbors");
        update_if_present!(surrogate.surrogate_idw_power, "surrogate_idw_power");
        update_if_present!(surrogate.surrogate_population, "surrogate_population");
        update_if_present!(surrogate.surrogate_generations, "surrogate_generations");
        update_if_present!(surrogate.surrogate_tournament, "surrogate_tournament");
        update_if_present!(surrogate.surrogate_blend_alpha, "surrogate_blend_alpha");
        update_if_present!(surrogate.surrogate_mutation_sigma, "surrogate_mutation_sigma");
        update_if_present!(surrogate.surrogate_mutation_rate, "surrogate_mutation_rate");
        update_if_present!(surrogate.surrogate_exploit, "surrogate_exploit");
        update_if_present!(surrogate.surrogate_explore, "surrogate_explore");
        update_if_present!(surrogate.surrogate_penalty, "surrogate_penalty");

        update_if_present!(response_surface.rsm_doe_samples, "rsm_doe_samples");
        update_if_present!(response_surface.rsm_interaction_limit, "rsm_interaction_limit");
        update_if_present!(response_surface.rsm_trust_radius, "rsm_trust_radius");
        update_if_present!(response_surface.rsm_min_radius, "rsm_min_radius");
        update_if_present!(response_surface.rsm_max_radius, "rsm_max_radius");
        update_if_present!(response_surface.rsm_grow, "rsm_grow");
        update_if_present!(response_surface.rsm_shrink, "rsm_shrink");
        update_if_present!(response_surface.rsm_error_threshold, "rsm_error_threshold");
        update_if_present!(response_surface.rsm_penalty, "rsm_penalty");
        update_if_present!(response_surface.rsm_qp_iterations, "rsm_qp_iterations");
    }
}
