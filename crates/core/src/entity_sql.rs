//! SQL for single-row operations on a generated module's table.
//!
//! Every statement returns rows as `to_jsonb`, so the dispatcher works with
//! `serde_json::Value` regardless of the module's columns. Column values are
//! bound as text and cast to the column type in SQL.

use crate::descriptor::DELETED_AT_COLUMN;
use crate::error::CoreError;
use crate::schema::{quote_ident, TableSchema};
use crate::surface::{scope_predicate, RowScope};

/// Statement builder over one table's schema.
#[derive(Debug, Clone, Copy)]
pub struct EntitySql<'a> {
    table: &'a TableSchema,
}

impl<'a> EntitySql<'a> {
    pub fn new(table: &'a TableSchema) -> Self {
        Self { table }
    }

    fn name(&self) -> String {
        quote_ident(&self.table.name)
    }

    fn scoped(&self, base: String, scope: RowScope) -> String {
        match scope_predicate("t", self.table.soft_deletes(), scope) {
            Some(predicate) => format!("{base} AND {predicate}"),
            None => base,
        }
    }

    fn cast(&self, column: &str, placeholder: usize) -> Result<String, CoreError> {
        let def = self.table.column(column).ok_or_else(|| {
            CoreError::Validation(format!(
                "Column '{column}' does not exist on '{}'",
                self.table.name
            ))
        })?;
        Ok(format!("CAST(${placeholder} AS {})", def.column_type.cast_sql()))
    }

    /// Select one row by id (`$1`).
    pub fn find(&self, scope: RowScope) -> String {
        self.scoped(
            format!("SELECT to_jsonb(t) FROM {} t WHERE t.\"id\" = $1", self.name()),
            scope,
        )
    }

    /// Insert one row; `columns` bind as `$1..$n` in order.
    pub fn insert(&self, columns: &[&str]) -> Result<String, CoreError> {
        let body = if columns.is_empty() {
            "DEFAULT VALUES".to_string()
        } else {
            let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
            let values = columns
                .iter()
                .enumerate()
                .map(|(i, c)| self.cast(c, i + 1))
                .collect::<Result<Vec<_>, _>>()?;
            format!("({}) VALUES ({})", names.join(", "), values.join(", "))
        };
        Ok(format!(
            "WITH inserted AS (INSERT INTO {} {body} RETURNING *) \
             SELECT to_jsonb(inserted) FROM inserted",
            self.name()
        ))
    }

    /// Update a live row; `columns` bind as `$1..$n`, the id as `$n+1`.
    /// Always touches `updated_at`.
    pub fn update(&self, columns: &[&str]) -> Result<String, CoreError> {
        let mut sets = columns
            .iter()
            .enumerate()
            .map(|(i, c)| Ok(format!("{} = {}", quote_ident(c), self.cast(c, i + 1)?)))
            .collect::<Result<Vec<_>, CoreError>>()?;
        sets.push("\"updated_at\" = now()".into());

        let base = format!(
            "UPDATE {} t SET {} WHERE t.\"id\" = ${}",
            self.name(),
            sets.join(", "),
            columns.len() + 1
        );
        Ok(format!(
            "WITH updated AS ({} RETURNING t.*) SELECT to_jsonb(updated) FROM updated",
            self.scoped(base, RowScope::Live)
        ))
    }

    /// Move a live row to the trash (`$1` = id).
    pub fn soft_delete(&self) -> String {
        self.scoped(
            format!(
                "UPDATE {} t SET {} = now() WHERE t.\"id\" = $1",
                self.name(),
                quote_ident(DELETED_AT_COLUMN)
            ),
            RowScope::Live,
        )
    }

    /// Bring a trashed row back (`$1` = id).
    pub fn restore(&self) -> String {
        self.scoped(
            format!(
                "UPDATE {} t SET {} = NULL, \"updated_at\" = now() WHERE t.\"id\" = $1",
                self.name(),
                quote_ident(DELETED_AT_COLUMN)
            ),
            RowScope::Trashed,
        )
    }

    /// Permanently delete one row in `scope` (`$1` = id).
    pub fn hard_delete(&self, scope: RowScope) -> String {
        self.scoped(
            format!("DELETE FROM {} t WHERE t.\"id\" = $1", self.name()),
            scope,
        )
    }

    /// Permanently delete every trashed row.
    pub fn empty_trash(&self) -> String {
        format!(
            "DELETE FROM {} t WHERE t.{} IS NOT NULL",
            self.name(),
            quote_ident(DELETED_AT_COLUMN)
        )
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::descriptor::{FieldType, LocalizedText};
    use crate::module_config::{build_config, GenerateModuleRequest, PropertyInput};
    use crate::schema::primary_table;

    fn table(trash: bool) -> TableSchema {
        let request = GenerateModuleRequest {
            code_module: "news".into(),
            slug: "novosti".into(),
            status: "active".into(),
            name: LocalizedText::from([("ru".to_string(), "Новости".to_string())]),
            option_trash: trash,
            properties: vec![
                PropertyInput {
                    code: "title".into(),
                    field_type: FieldType::String,
                    name: LocalizedText::new(),
                    required: true,
                },
                PropertyInput {
                    code: "price".into(),
                    field_type: FieldType::Decimal,
                    name: LocalizedText::new(),
                    required: false,
                },
            ],
            ..Default::default()
        };
        primary_table(&build_config(&request, Path::new("/m")).unwrap())
    }

    #[test]
    fn insert_casts_each_column() {
        let table = table(false);
        let sql = EntitySql::new(&table)
            .insert(&["title", "price", "author_id"])
            .unwrap();
        assert_eq!(
            sql,
            "WITH inserted AS (INSERT INTO \"news\" (\"title\", \"price\", \"author_id\") \
             VALUES (CAST($1 AS VARCHAR(255)), CAST($2 AS DECIMAL(10,2)), CAST($3 AS BIGINT)) \
             RETURNING *) SELECT to_jsonb(inserted) FROM inserted"
        );
    }

    #[test]
    fn insert_without_columns_uses_defaults() {
        let table = table(false);
        let sql = EntitySql::new(&table).insert(&[]).unwrap();
        assert!(sql.contains("INSERT INTO \"news\" DEFAULT VALUES"));
    }

    #[test]
    fn unknown_column_is_rejected() {
        let table = table(false);
        assert!(EntitySql::new(&table).insert(&["nope"]).is_err());
        assert!(EntitySql::new(&table).update(&["nope"]).is_err());
    }

    #[test]
    fn update_binds_id_last_and_skips_trashed() {
        let table = table(true);
        let sql = EntitySql::new(&table).update(&["title"]).unwrap();
        assert_eq!(
            sql,
            "WITH updated AS (UPDATE \"news\" t SET \"title\" = CAST($1 AS VARCHAR(255)), \
             \"updated_at\" = now() WHERE t.\"id\" = $2 AND t.\"deleted_at\" IS NULL \
             RETURNING t.*) SELECT to_jsonb(updated) FROM updated"
        );
    }

    #[test]
    fn find_scopes_only_soft_delete_tables() {
        let plain = table(false);
        assert_eq!(
            EntitySql::new(&plain).find(RowScope::Live),
            "SELECT to_jsonb(t) FROM \"news\" t WHERE t.\"id\" = $1"
        );
        let trash = table(true);
        assert!(EntitySql::new(&trash)
            .find(RowScope::Trashed)
            .ends_with("AND t.\"deleted_at\" IS NOT NULL"));
    }

    #[test]
    fn trash_statements() {
        let table = table(true);
        let sql = EntitySql::new(&table);
        assert!(sql.soft_delete().contains("SET \"deleted_at\" = now()"));
        assert!(sql.restore().contains("SET \"deleted_at\" = NULL"));
        assert!(sql
            .hard_delete(RowScope::Trashed)
            .ends_with("t.\"deleted_at\" IS NOT NULL"));
        assert_eq!(
            sql.empty_trash(),
            "DELETE FROM \"news\" t WHERE t.\"deleted_at\" IS NOT NULL"
        );
    }
}
