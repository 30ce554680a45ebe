pub mod allowable;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod loader;
pub mod model;
pub mod optimizer;
pub mod proximity;
pub mod simulator;
pub mod util;
pub mod weight;

pub use error::{SizerError, SizerResult};
