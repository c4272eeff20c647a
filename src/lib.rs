pub mod cli;
pub mod error;
pub mod layer;
pub mod protocol;
pub mod scoring;
pub mod selection;
pub mod trace;
pub mod tree;
pub mod xpath;

pub use error::{AppError, DispatchError, ParseError, QueryError, ScoringError};
pub use protocol::matcher::select_from_dump;
pub use selection::resolver::resolve;
pub use tree::parser::{parse_lenient, parse_ui_dump};
pub use tree::ui_node::{NodeId, UiNode, UiTree};
