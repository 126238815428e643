pub mod artifact;
pub mod cli;
pub mod deps;
pub mod emit;
pub mod error;
pub mod generator;
pub mod ir;
pub mod schema;
pub mod work;
pub mod worker_pool;

pub use error::{Error, ErrorKind, Result};
pub use generator::{BottomTypeConfig, BuildReport, Generator, GeneratorConfig};
