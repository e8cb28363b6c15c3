//! Request handlers.
//!
//! `modules` administers the module registry and drives the generator;
//! `module_entities` and `module_api` dispatch requests for generated
//! modules through their loaded manifests. Handlers delegate to the
//! repositories in `cms_db` and map errors via [`AppError`].
//!
//! [`AppError`]: crate::error::AppError

pub mod module_api;
pub mod module_entities;
pub mod modules;
