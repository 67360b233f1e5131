//! CLI command handlers.

mod collect;
mod fetch;
mod list;

pub use fetch::run_fetch;
pub use list::run_list;
