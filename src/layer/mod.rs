pub mod render;
pub mod semantic;
