//! Domain logic for the CMS module generator.
//!
//! Everything in this crate is free of I/O: naming, descriptor validation,
//! reserved-name policy, schema/model/surface synthesis, request validation
//! rules and the generation state machine. The `db` and `api` crates supply
//! the database, filesystem and HTTP collaborators.

pub mod conflict;
pub mod descriptor;
pub mod entity_sql;
pub mod error;
pub mod generation;
pub mod manifest;
pub mod model_def;
pub mod module_config;
pub mod naming;
pub mod reserved;
pub mod roles;
pub mod schema;
pub mod surface;
pub mod types;
pub mod validation_rules;
