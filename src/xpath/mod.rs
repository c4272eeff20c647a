pub mod evaluator;
pub mod query;
