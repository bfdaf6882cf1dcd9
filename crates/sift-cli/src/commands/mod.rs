pub mod build;
pub mod config;
pub mod import;
pub mod query;
pub mod search;
pub mod status;

pub use build::run_build;
pub use import::run_import;
pub use query::run_query;
pub use search::run_search;
pub use status::show_status;
