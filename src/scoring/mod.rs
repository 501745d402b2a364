pub mod config;
pub mod engine;
pub mod ranking;
pub mod rules;
pub mod validation;

pub use config::*;
pub use engine::{aggregate, AggregatedScore, PanelResult};
pub use ranking::{rank, Standing};
pub use validation::validate_scoring;
