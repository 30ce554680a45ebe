use crate::reports;
use crate::Inputs;
use clap::Args;
use rfsizer::config::Config;
use rfsizer::evaluator::DesignEvaluator;
use rfsizer::optimizer::{OptimizationOptions, Optimizer, StrategyKind};
use rfsizer::proximity::ProximityMap;
use rfsizer::simulator::InternalLoadSimulator;
use rfsizer::weight::WeightModel;
use rfsizer::{SizerError, SizerResult};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Args, Debug, Clone)]
pub struct OptimizeArgs {
    #[command(flatten)]
    pub config: Config,

    /// Internal loads CSV (subcase,element,load)
    #[arg(short, long)]
    pub loads: PathBuf,

    #[arg(short = 's', long, value_enum, default_value_t = StrategyKind::FsdBottomUp)]
    pub strategy: StrategyKind,

    /// Directory for iteration history and training sample CSVs
    #[arg(long)]
    pub history: Option<PathBuf>,
}

pub fn run(args: &OptimizeArgs, config: &Config, inputs: &Inputs) -> SizerResult<()> {
    let (simulator, _) = InternalLoadSimulator::from_file(inputs.model.clone(), &args.loads)?;
    let weights = Arc::new(WeightModel::new(&inputs.model, config.run.default_density));
    let proximity = Arc::new(ProximityMap::build(&inputs.model, config.run.search_distance));

    let mut evaluator = DesignEvaluator::new(
        inputs.model.clone(),
        inputs.allowables.clone(),
        weights,
        simulator,
    );
    if let Some(table) = &inputs.combinations {
        evaluator = evaluator.with_combinations(table.clone());
    }

    let optimizer = Optimizer::new(evaluator, proximity, OptimizationOptions::from(config));
    let strategy = args.strategy.build(config);
    info!("🔥 Strategy: {}", args.strategy);

    let job = optimizer.spawn(strategy, inputs.model.initial_design());
    for progress in job.progress.iter() {
        if let Some(best) = progress.best_weight {
            debug!("progress: iteration {}, best weight {:.4}", progress.iteration, best);
        }
    }
    let summary = job
        .handle
        .join()
        .map_err(|_| SizerError::Simulation("optimization worker panicked".to_string()))?;

    println!("\n🏆 === OPTIMIZATION RESULT === 🏆");
    reports::print_history_table(&summary.history);
    match &summary.best {
        Some(best) => {
            reports::print_property_table(&inputs.model, &best.design, &best.result, config.run.target_rf);
            reports::print_evaluation_summary(&best.result, config.run.target_rf, config.run.rf_tolerance);
        }
        None => println!("\n⚠️  No feasible design found in {} iterations.", summary.history.len()),
    }
    println!(
        "\nStopped: {} | evaluations: {} | failed: {} | numerical fallbacks: {}",
        summary.stop_reason, summary.evaluations, summary.failed_evaluations, summary.numerical_failures
    );

    if let Some(dir) = &args.history {
        std::fs::create_dir_all(dir)?;
        let history_path = dir.join("history.csv");
        reports::write_history_csv(&history_path, &summary.history)?;
        info!("💾 History written to {}", history_path.display());
        if !summary.training_samples.is_empty() {
            let samples_path = dir.join("training_samples.csv");
            reports::write_training_csv(&samples_path, &summary.training_samples)?;
            info!("💾 Training samples written to {}", samples_path.display());
        }
        if let Some(best) = &summary.best {
            let design_path = dir.join("best_design.json");
            std::fs::write(&design_path, serde_json::to_string_pretty(&best.design)?)?;
            info!("💾 Best design written to {}", design_path.display());
        }
    }
    Ok(())
}
