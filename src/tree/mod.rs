pub mod bounds;
pub mod parser;
pub mod ui_node;
