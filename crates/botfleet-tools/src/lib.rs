pub mod context;
pub mod tools;

pub use context::ToolContext;
pub use tools::register_all;
