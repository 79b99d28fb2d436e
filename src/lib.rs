//! dbsuite resolves named database test profiles into concrete data sources
//! and runs one backend-specialized test suite per data source.
//!
//! The pipeline, leaves first:
//!
//! - [`syntax`] parses the s-expression store files;
//! - [`store`] exposes the profile table and the data-source registry;
//! - [`resolver`] flattens `(profile ...)`, `(ref ...)` and `(dsn ...)`
//!   expressions into an ordered list of [`resolver::NamedConfig`]s;
//! - [`backend`] adapts each descriptor into a lazy [`backend::Connector`];
//! - [`modules`] binds the standard test modules to a connector;
//! - [`driver`] runs or renders the resulting suites.

pub mod backend;
pub mod cli;
pub mod config;
pub mod descriptor;
pub mod driver;
pub mod errors;
pub mod logging;
pub mod modules;
pub mod render;
pub mod resolver;
pub mod store;
pub mod suite;
pub mod syntax;
pub mod types;

pub use errors::{ErrorKind, HarnessError};
