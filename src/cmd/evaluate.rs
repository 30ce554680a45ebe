use crate::reports;
use crate::Inputs;
use clap::Args;
use rfsizer::config::Config;
use rfsizer::evaluator::DesignEvaluator;
use rfsizer::model::DesignBounds;
use rfsizer::simulator::InternalLoadSimulator;
use rfsizer::weight::WeightModel;
use rfsizer::SizerResult;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub config: Config,

    /// Internal loads CSV (subcase,element,load)
    #[arg(short, long)]
    pub loads: PathBuf,

    /// Print every element instead of the per-property summary
    #[arg(long, default_value_t = false)]
    pub elements: bool,
}

pub fn run(args: &EvaluateArgs, config: &Config, inputs: &Inputs) -> SizerResult<()> {
    let (simulator, _) = InternalLoadSimulator::from_file(inputs.model.clone(), &args.loads)?;
    let weights = Arc::new(WeightModel::new(&inputs.model, config.run.default_density));
    let mut evaluator = DesignEvaluator::new(
        inputs.model.clone(),
        inputs.allowables.clone(),
        weights,
        simulator,
    );
    if let Some(table) = &inputs.combinations {
        evaluator = evaluator.with_combinations(table.clone());
    }

    let bounds = DesignBounds::from_model(&inputs.model, config.run.floor_lock);
    let design = bounds.clamp(&inputs.model.initial_design());
    let result = evaluator.evaluate(&design, config.run.target_rf)?;

    println!("\n🔎 === DESIGN EVALUATION === 🔎");
    if args.elements {
        reports::print_element_table(&result);
    }
    reports::print_property_table(&inputs.model, &design, &result, config.run.target_rf);
    reports::print_evaluation_summary(&result, config.run.target_rf, config.run.rf_tolerance);
    Ok(())
}
