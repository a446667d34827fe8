//! tierconf library
//!
//! Hierarchical, environment-aware configuration resolution. Exposed for the
//! command line tool and for integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod settings;
pub mod store;
