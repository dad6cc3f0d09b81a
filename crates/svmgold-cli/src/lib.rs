#![forbid(unsafe_code)]

//! `svmgold` command-line driver.

pub mod cli;
pub mod corpus;
pub mod error;
pub mod inspect;
pub mod logging;
pub mod run;
pub mod table;

pub use cli::run_from_env;
pub use error::{CliError, Result};
