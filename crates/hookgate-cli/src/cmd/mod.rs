pub mod checks;
pub mod config;
pub mod hook;
pub mod log;
