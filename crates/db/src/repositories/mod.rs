//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or a connection inside a caller's transaction) as the
//! first argument.

pub mod generation_lock;
pub mod module_entity_repo;
pub mod module_migration_repo;
pub mod module_record_repo;
pub mod permission_repo;
pub mod schema_repo;
pub mod user_repo;

pub use generation_lock::GenerationLock;
pub use module_entity_repo::{EntityPage, ModuleEntityRepo};
pub use module_migration_repo::ModuleMigrationRepo;
pub use module_record_repo::ModuleRecordRepo;
pub use permission_repo::PermissionRepo;
pub use schema_repo::SchemaRepo;
pub use user_repo::UserRepo;
