pub mod config;
pub mod schedule;

pub use config::*;
pub use schedule::*;
