//! REST API module
//!
//! The [`RestApi`] facade: paged queries through the pagination drivers,
//! plus single-object create, read, update, delete and collection edits.

mod client;

pub use client::RestApi;
