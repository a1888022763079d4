#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

mod config;
pub mod optimizer;
pub mod support;

pub use crate::config::OptimizerConfig;
pub use crate::optimizer::{Optimizer, STAGE_NAMES};
