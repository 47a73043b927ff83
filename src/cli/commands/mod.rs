//! CLI command implementations

pub mod badge;
pub mod cache;
pub mod config;
pub mod resolve;
pub mod scan;

pub use badge::execute as badge;
pub use cache::execute as cache;
pub use config::execute as config;
pub use resolve::execute as resolve;
pub use scan::execute as scan;
