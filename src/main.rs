use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser, Subcommand};
use rfsizer::allowable::{load_allowables, AllowableModel};
use rfsizer::config::Config;
use rfsizer::evaluator::{load_combinations, CombinationTable};
use rfsizer::model::StructuralModel;
use rfsizer::{SizerError, SizerResult};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info, Level};

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Structural model (JSON: properties, elements, materials)
    #[arg(global = true, short, long, default_value = "data/model.json")]
    model: PathBuf,

    /// Allowable samples CSV (level,id,thickness,allowable[,element_type])
    #[arg(global = true, short, long, default_value = "data/allowables.csv")]
    allowables: PathBuf,

    /// Residual-strength combination sheet (CSV, CASE/MULT column pairs)
    #[arg(global = true, long)]
    combinations: Option<PathBuf>,

    /// JSON run configuration; explicit command-line options override it
    #[arg(global = true, long)]
    config: Option<PathBuf>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Fit(cmd::fit::FitArgs),
    Evaluate(cmd::evaluate::EvaluateArgs),
    Optimize(cmd::optimize::OptimizeArgs),
}

/// Static inputs shared by every subcommand.
pub struct Inputs {
    pub model: Arc<StructuralModel>,
    pub allowables: Arc<AllowableModel>,
    pub combinations: Option<Arc<CombinationTable>>,
}

fn resolve_config(cli: &Cli, cli_config: &Config, sub_matches: &ArgMatches) -> SizerResult<Config> {
    let config = match &cli.config {
        Some(path) => {
            info!("⚖️  Loading config from: {}", path.display());
            let mut file_config = Config::load_from_file(path)?;
            file_config.merge_from_cli(cli_config, sub_matches);
            file_config
        }
        None => cli_config.clone(),
    };
    config.validate()?;
    Ok(config)
}

fn load_inputs(cli: &Cli, config: &Config) -> SizerResult<Inputs> {
    info!("📂 Loading model: {}", cli.model.display());
    let model = StructuralModel::load_from_file(&cli.model)?;
    info!(
        "   {} properties ({} bars, {} skins), {} elements",
        model.properties().len(),
        model.bar_properties().count(),
        model.skin_properties().count(),
        model.elements().len()
    );

    info!("📂 Loading allowables: {}", cli.allowables.display());
    let (samples, _) = load_allowables(&cli.allowables)?;
    let allowables = AllowableModel::fit(&samples, &config.fit);

    let combinations = match &cli.combinations {
        Some(path) => {
            let (table, _) = load_combinations(path)?;
            Some(Arc::new(table))
        }
        None => None,
    };

    Ok(Inputs {
        model: Arc::new(model),
        allowables: Arc::new(allowables),
        combinations,
    })
}

fn execute(cli: Cli, matches: &ArgMatches) -> SizerResult<()> {
    let (cli_config, sub_name) = match &cli.command {
        Commands::Fit(args) => (&args.config, "fit"),
        Commands::Evaluate(args) => (&args.config, "evaluate"),
        Commands::Optimize(args) => (&args.config, "optimize"),
    };
    let sub_matches = matches
        .subcommand_matches(sub_name)
        .ok_or_else(|| SizerError::Config(format!("missing '{}' arguments", sub_name)))?;

    let config = resolve_config(&cli, cli_config, sub_matches)?;
    let inputs = load_inputs(&cli, &config)?;

    match &cli.command {
        Commands::Fit(args) => cmd::fit::run(args, &inputs),
        Commands::Evaluate(args) => cmd::evaluate::run(args, &config, &inputs),
        Commands::Optimize(args) => cmd::optimize::run(args, &config, &inputs),
    }
}

fn main() {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    info!("🚀 Initializing RF sizer...");

    if let Err(e) = execute(cli, &matches) {
        error!("❌ {}", e);
        process::exit(1);
    }
}
