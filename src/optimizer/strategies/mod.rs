pub mod decoupled;
pub mod efficient;
pub mod fsd;
pub mod surrogate_search;
pub mod trust_region;

pub use self::decoupled::{Decoupled, Phase};
pub use self::efficient::WeightEfficient;
pub use self::fsd::{FullyStressed, StartBound};
pub use self::surrogate_search::SurrogateSearch;
pub use self::trust_region::TrustRegion;

use super::rf_map::PropertyRf;
use crate::config::StressRatioParams;
use crate::model::{DesignBounds, PropertyId};
use crate::util::limited_step;

/// Stress-ratio resize `t × (target / rf)^α`. Proximity-derived RFs use the
/// softer exponent and step.
pub(crate) fn stress_ratio_resize(
    current: f64,
    rf: PropertyRf,
    target_rf: f64,
    params: &StressRatioParams,
) -> f64 {
    let (alpha, max_step) = if rf.is_direct() {
        (params.fsd_alpha, params.fsd_max_step)
    } else {
        (params.proximity_alpha, params.proximity_max_step)
    };
    let rf = rf.value();
    if !(rf.is_finite() && rf > 0.0) {
        return current;
    }
    limited_step(current, (target_rf / rf).powf(alpha), max_step)
}

/// Within tolerance of the target, or pinned at the bound that blocks the
/// move the RF asks for.
pub(crate) fn is_settled(
    bounds: &DesignBounds,
    id: PropertyId,
    value: f64,
    rf: f64,
    target_rf: f64,
    tolerance: f64,
) -> bool {
    if (rf - target_rf).abs() <= tolerance {
        return true;
    }
    match bounds.get(id) {
        Some((lo, hi)) => (rf < target_rf && value >= hi) || (rf > target_rf && value <= lo),
        None => true,
    }
}
