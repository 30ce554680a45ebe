use crate::reports;
use crate::Inputs;
use clap::Args;
use rfsizer::config::Config;
use rfsizer::SizerResult;

#[derive(Args, Debug, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub config: Config,

    /// Also list element-level fits
    #[arg(long, default_value_t = false)]
    pub elements: bool,
}

pub fn run(args: &FitArgs, inputs: &Inputs) -> SizerResult<()> {
    println!("\n📈 === ALLOWABLE FITS === 📈");
    reports::print_fit_table("Property", inputs.allowables.property_fits());
    if args.elements {
        reports::print_fit_table("Element", inputs.allowables.element_fits());
    }
    let summary = inputs.allowables.summary();
    println!(
        "\n{} property fits ({} excluded), {} element fits ({} excluded)",
        summary.property_fits, summary.property_excluded, summary.element_fits, summary.element_excluded
    );
    Ok(())
}
