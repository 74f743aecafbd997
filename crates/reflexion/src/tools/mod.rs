//! A set of built-in tools that models can use.

mod current_time;
mod web_search;

pub use current_time::CurrentTimeTool;
pub use web_search::WebSearchTool;
