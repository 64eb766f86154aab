//! CLI module
//!
//! Command-line interface for querying a paged-collection API.
//!
//! # Commands
//!
//! - `query` - Stream every matching record
//! - `batch` - Stream matching records in fixed-size batches
//! - `get` - Read one object
//! - `delete` - Delete one object

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat, QueryArgs};
pub use runner::Runner;
