//! Dynamic CRUD over generated module tables.
//!
//! Rows travel as JSON objects (`to_jsonb`), so one repository serves every
//! module. Statements come from [`cms_core::entity_sql`] and
//! [`cms_core::surface::build_listing_query`]; table and column names in
//! them are taken from the module's schema manifest, never from requests.

use cms_core::entity_sql::EntitySql;
use cms_core::schema::TableSchema;
use cms_core::surface::{build_listing_query, ListingContract, ResolvedListing, RowScope};
use cms_core::types::DbId;
use cms_core::validation_rules::ValidatedValues;
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

/// One page of rows plus the unpaged total.
#[derive(Debug, Clone, Serialize)]
pub struct EntityPage {
    pub items: Vec<Value>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Provides row operations on any generated module table.
pub struct ModuleEntityRepo;

impl ModuleEntityRepo {
    /// One listing page in `scope`.
    pub async fn list(
        pool: &PgPool,
        contract: &ListingContract,
        listing: &ResolvedListing,
        scope: RowScope,
    ) -> Result<EntityPage, sqlx::Error> {
        let query = build_listing_query(contract, listing, scope);

        let mut select = sqlx::query_scalar::<_, Value>(&query.select_sql);
        let mut count = sqlx::query_scalar::<_, i64>(&query.count_sql);
        for bind in &query.binds {
            select = select.bind(bind);
            count = count.bind(bind);
        }

        let items = select.fetch_all(pool).await?;
        let total = count.fetch_one(pool).await?;

        Ok(EntityPage {
            items,
            total,
            page: listing.page,
            per_page: listing.per_page,
        })
    }

    /// Find one row by id within `scope`.
    pub async fn find(
        pool: &PgPool,
        table: &TableSchema,
        id: DbId,
        scope: RowScope,
    ) -> Result<Option<Value>, sqlx::Error> {
        sqlx::query_scalar::<_, Value>(&EntitySql::new(table).find(scope))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Insert a row from validated values, returning it.
    pub async fn insert(
        pool: &PgPool,
        table: &TableSchema,
        values: &ValidatedValues,
    ) -> Result<Value, sqlx::Error> {
        let columns: Vec<&str> = values.iter().map(|(c, _)| c.as_str()).collect();
        let sql = EntitySql::new(table)
            .insert(&columns)
            .map_err(|e| sqlx::Error::ColumnNotFound(e.to_string()))?;

        let mut query = sqlx::query_scalar::<_, Value>(&sql);
        for (_, value) in values {
            query = query.bind(value);
        }
        query.fetch_one(pool).await
    }

    /// Update a live row. Returns `None` if no live row has this id.
    pub async fn update(
        pool: &PgPool,
        table: &TableSchema,
        id: DbId,
        values: &ValidatedValues,
    ) -> Result<Option<Value>, sqlx::Error> {
        let columns: Vec<&str> = values.iter().map(|(c, _)| c.as_str()).collect();
        let sql = EntitySql::new(table)
            .update(&columns)
            .map_err(|e| sqlx::Error::ColumnNotFound(e.to_string()))?;

        let mut query = sqlx::query_scalar::<_, Value>(&sql);
        for (_, value) in values {
            query = query.bind(value);
        }
        query.bind(id).fetch_optional(pool).await
    }

    /// Move a live row to the trash. Returns `true` if a row was affected.
    pub async fn soft_delete(
        pool: &PgPool,
        table: &TableSchema,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&EntitySql::new(table).soft_delete())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Restore a trashed row. Returns `true` if a row was affected.
    pub async fn restore(pool: &PgPool, table: &TableSchema, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&EntitySql::new(table).restore())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Permanently delete one row within `scope`.
    pub async fn hard_delete(
        pool: &PgPool,
        table: &TableSchema,
        id: DbId,
        scope: RowScope,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&EntitySql::new(table).hard_delete(scope))
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Permanently delete every trashed row. Returns the number removed.
    pub async fn empty_trash(pool: &PgPool, table: &TableSchema) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(&EntitySql::new(table).empty_trash())
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
