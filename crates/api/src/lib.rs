//! CMS module generator API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes, the
//! module generator and catalog) so integration tests and the binary
//! entrypoint can both access them.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod generator;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
