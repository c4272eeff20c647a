pub mod batch;
pub mod dedup;
pub mod dispatch;
pub mod exclude;
pub mod resolver;
pub mod selection_model;
pub mod similarity;
