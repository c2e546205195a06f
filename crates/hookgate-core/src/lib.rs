pub mod audit;
pub mod check;
pub mod checks;
pub mod config;
pub mod decision;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod io;
pub mod paths;
pub mod runner;

pub use error::{HookError, Result};
