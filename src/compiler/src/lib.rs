#[macro_use]
extern crate log;

mod compiler;
pub mod ddl;
pub mod query;

pub use crate::compiler::{Compiler, Outcome};
