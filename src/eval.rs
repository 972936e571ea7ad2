pub mod ranks;
pub mod registry;
pub mod tables;
pub mod types;

pub use registry::EvaluatorRegistry;
pub use types::{EvalError, EvaluationType, Evaluator, HandRanking};
