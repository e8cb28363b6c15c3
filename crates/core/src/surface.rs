//! Web and API surface for generated modules.
//!
//! The surface is data: route tables, the listing contract and the request
//! validators. The API crate serves every module through one table-driven
//! dispatcher that consults these definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::descriptor::{ModuleDescriptor, DELETED_AT_COLUMN};
use crate::error::CoreError;
use crate::module_config::ModuleConfig;
use crate::schema::{primary_table, quote_ident};
use crate::validation_rules::{RequestValidator, ValidationMode};

/// Default listing sort column.
pub const DEFAULT_SORT_BY: &str = "created_at";

/// Default page size.
pub const DEFAULT_PER_PAGE: i64 = 10;

/// Largest page size a client may request.
pub const MAX_PER_PAGE: i64 = 100;

/// Largest page number; keeps `(page - 1) * per_page` within `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAction {
    Index,
    Create,
    Store,
    Edit,
    Update,
    Destroy,
    TrashIndex,
    TrashRestore,
    TrashForce,
    TrashEmpty,
    Show,
}

impl RouteAction {
    /// Route name suffix, e.g. `trash.restore`.
    pub fn name(self) -> &'static str {
        match self {
            RouteAction::Index => "index",
            RouteAction::Create => "create",
            RouteAction::Store => "store",
            RouteAction::Edit => "edit",
            RouteAction::Update => "update",
            RouteAction::Destroy => "destroy",
            RouteAction::TrashIndex => "trash.index",
            RouteAction::TrashRestore => "trash.restore",
            RouteAction::TrashForce => "trash.force",
            RouteAction::TrashEmpty => "trash.empty",
            RouteAction::Show => "show",
        }
    }
}

impl fmt::Display for RouteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDef {
    /// Fully qualified route name, e.g. `admin.news.index`.
    pub name: String,
    pub method: HttpMethod,
    /// Path relative to the surface root, e.g. `/news/{id}/edit`.
    pub path: String,
    pub action: RouteAction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    pub routes: Vec<RouteDef>,
}

impl RouteTable {
    pub fn find(&self, action: RouteAction) -> Option<&RouteDef> {
        self.routes.iter().find(|r| r.action == action)
    }

    pub fn has(&self, action: RouteAction) -> bool {
        self.find(action).is_some()
    }

    pub fn names(&self) -> Vec<&str> {
        self.routes.iter().map(|r| r.name.as_str()).collect()
    }
}

fn route(prefix: &str, method: HttpMethod, path: String, action: RouteAction) -> RouteDef {
    RouteDef {
        name: format!("{prefix}{}", action.name()),
        method,
        path,
        action,
    }
}

/// Admin routes under `/{code}`; trash routes only when trash is enabled.
pub fn web_routes(config: &ModuleConfig) -> RouteTable {
    let code = config.code();
    let prefix = &config.names.route_name_prefix;
    let mut routes = vec![
        route(prefix, HttpMethod::Get, format!("/{code}"), RouteAction::Index),
        route(prefix, HttpMethod::Get, format!("/{code}/create"), RouteAction::Create),
        route(prefix, HttpMethod::Post, format!("/{code}"), RouteAction::Store),
        route(prefix, HttpMethod::Get, format!("/{code}/{{id}}/edit"), RouteAction::Edit),
        route(prefix, HttpMethod::Put, format!("/{code}/{{id}}"), RouteAction::Update),
        route(prefix, HttpMethod::Delete, format!("/{code}/{{id}}"), RouteAction::Destroy),
    ];

    if config.options().trash {
        routes.extend([
            route(prefix, HttpMethod::Get, format!("/{code}/trash"), RouteAction::TrashIndex),
            route(
                prefix,
                HttpMethod::Post,
                format!("/{code}/trash/{{id}}/restore"),
                RouteAction::TrashRestore,
            ),
            route(
                prefix,
                HttpMethod::Delete,
                format!("/{code}/trash/{{id}}/force"),
                RouteAction::TrashForce,
            ),
            route(
                prefix,
                HttpMethod::Post,
                format!("/{code}/trash/empty"),
                RouteAction::TrashEmpty,
            ),
        ]);
    }

    RouteTable { routes }
}

/// Public read-only routes: `api.{code}.index` and `api.{code}.show`.
pub fn api_routes(config: &ModuleConfig) -> RouteTable {
    let code = config.code();
    let prefix = &config.names.api_route_name_prefix;
    RouteTable {
        routes: vec![
            route(prefix, HttpMethod::Get, format!("/api/{code}"), RouteAction::Index),
            route(prefix, HttpMethod::Get, format!("/api/{code}/{{id}}"), RouteAction::Show),
        ],
    }
}

// ---------------------------------------------------------------------------
// Listing contract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Columns whose text the listing search matches: `string`/`text` fields,
/// plus `slug` when SEO is enabled.
pub fn search_fields(descriptor: &ModuleDescriptor) -> Vec<String> {
    let mut fields: Vec<String> = descriptor
        .fields
        .iter()
        .filter(|f| f.field_type.is_textual())
        .map(|f| f.code.clone())
        .collect();
    if descriptor.options.seo {
        fields.push("slug".into());
    }
    fields
}

/// Query string accepted by index endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingParams {
    pub search: Option<String>,
    #[serde(alias = "sort_by")]
    pub sort_by: Option<String>,
    #[serde(alias = "sort_order")]
    pub sort_order: Option<String>,
    #[serde(alias = "per_page")]
    pub per_page: Option<i64>,
    pub page: Option<i64>,
}

/// Listing behaviour of one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingContract {
    pub table: String,
    pub search_fields: Vec<String>,
    /// Columns `sortBy` may name.
    pub sortable: Vec<String>,
    pub default_sort_by: String,
    pub default_sort_order: SortOrder,
    pub default_per_page: i64,
    pub soft_deletes: bool,
}

impl ListingContract {
    pub fn for_module(config: &ModuleConfig) -> Self {
        let table = primary_table(config);
        Self {
            search_fields: search_fields(&config.descriptor),
            sortable: table.column_names().into_iter().map(str::to_string).collect(),
            soft_deletes: table.soft_deletes(),
            table: table.name,
            default_sort_by: DEFAULT_SORT_BY.into(),
            default_sort_order: SortOrder::Desc,
            default_per_page: DEFAULT_PER_PAGE,
        }
    }

    /// Apply defaults and check `params` against the contract.
    pub fn resolve(&self, params: &ListingParams) -> Result<ResolvedListing, CoreError> {
        let sort_by = match params.sort_by.as_deref().map(str::trim) {
            None | Some("") => self.default_sort_by.clone(),
            Some(column) if self.sortable.iter().any(|c| c == column) => column.to_string(),
            Some(column) => {
                return Err(CoreError::Validation(format!(
                    "Cannot sort by '{column}'. Sortable: {}",
                    self.sortable.join(", ")
                )))
            }
        };

        let sort_order = match params.sort_order.as_deref() {
            None => self.default_sort_order,
            Some(value) => SortOrder::parse(value).ok_or_else(|| {
                CoreError::Validation(format!("Sort order must be 'asc' or 'desc', got '{value}'"))
            })?,
        };

        let per_page = clamp_per_page(params.per_page, self.default_per_page);
        let page = clamp_page(params.page);

        Ok(ResolvedListing {
            search: params
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            sort_by,
            sort_order,
            per_page,
            page,
        })
    }
}

/// Listing parameters after defaults and bounds are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedListing {
    pub search: Option<String>,
    pub sort_by: String,
    pub sort_order: SortOrder,
    pub per_page: i64,
    pub page: i64,
}

impl ResolvedListing {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }
}

/// Clamp a requested page size to `1..=MAX_PER_PAGE`.
pub fn clamp_per_page(per_page: Option<i64>, default: i64) -> i64 {
    per_page.unwrap_or(default).clamp(1, MAX_PER_PAGE)
}

/// Pages are 1-based and capped at [`MAX_PAGE`].
pub fn clamp_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).clamp(1, MAX_PAGE)
}

/// Which rows a query sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowScope {
    /// Rows not in the trash.
    Live,
    /// Only soft-deleted rows.
    Trashed,
}

/// `WHERE` fragment restricting `alias` to `scope`; `None` when the table
/// has no soft deletes.
pub fn scope_predicate(alias: &str, soft_deletes: bool, scope: RowScope) -> Option<String> {
    if !soft_deletes {
        return None;
    }
    let column = format!("{alias}.{}", quote_ident(DELETED_AT_COLUMN));
    Some(match scope {
        RowScope::Live => format!("{column} IS NULL"),
        RowScope::Trashed => format!("{column} IS NOT NULL"),
    })
}

/// Escape `%`, `_` and `\` so a search term matches literally.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// A listing query: page select, total count and the shared binds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    /// Selects `to_jsonb(t)` rows for one page.
    pub select_sql: String,
    pub count_sql: String,
    pub binds: Vec<String>,
}

/// Build the SQL for one listing page.
///
/// The search term is bound once as `$1` and matched with `ILIKE` against
/// every search field. With no search fields the term is ignored.
pub fn build_listing_query(
    contract: &ListingContract,
    listing: &ResolvedListing,
    scope: RowScope,
) -> ListingQuery {
    let mut predicates: Vec<String> = scope_predicate("t", contract.soft_deletes, scope)
        .into_iter()
        .collect();
    let mut binds = Vec::new();

    if let Some(term) = &listing.search {
        if !contract.search_fields.is_empty() {
            let ors: Vec<String> = contract
                .search_fields
                .iter()
                .map(|f| format!("t.{} ILIKE $1", quote_ident(f)))
                .collect();
            predicates.push(format!("({})", ors.join(" OR ")));
            binds.push(format!("%{}%", escape_like(term)));
        }
    }

    let where_clause = if predicates.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", predicates.join(" AND "))
    };
    let table = quote_ident(&contract.table);

    ListingQuery {
        select_sql: format!(
            "SELECT to_jsonb(t) FROM {table} t{where_clause} ORDER BY t.{} {}, t.\"id\" {} LIMIT {} OFFSET {}",
            quote_ident(&listing.sort_by),
            listing.sort_order.sql(),
            listing.sort_order.sql(),
            listing.per_page,
            listing.offset()
        ),
        count_sql: format!("SELECT COUNT(*) FROM {table} t{where_clause}"),
        binds,
    }
}

// ---------------------------------------------------------------------------
// Surface definition
// ---------------------------------------------------------------------------

/// Everything the dispatcher needs to serve one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceDefinition {
    pub controller: String,
    pub api_controller: String,
    pub listing: ListingContract,
    pub web_routes: RouteTable,
    pub api_routes: RouteTable,
    pub store_request: RequestValidator,
    pub update_request: RequestValidator,
}

pub fn surface_definition(config: &ModuleConfig) -> SurfaceDefinition {
    let names = &config.names;
    SurfaceDefinition {
        controller: names.controller_name.clone(),
        api_controller: names.api_controller_name.clone(),
        listing: ListingContract::for_module(config),
        web_routes: web_routes(config),
        api_routes: api_routes(config),
        store_request: RequestValidator::for_module(
            names.store_request_name.clone(),
            ValidationMode::Store,
            &config.descriptor,
        ),
        update_request: RequestValidator::for_module(
            names.update_request_name.clone(),
            ValidationMode::Update,
            &config.descriptor,
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use assert_matches::assert_matches;

    use super::*;
    use crate::descriptor::{FieldType, LocalizedText};
    use crate::module_config::{build_config, GenerateModuleRequest, PropertyInput};

    fn property(code: &str, field_type: FieldType) -> PropertyInput {
        PropertyInput {
            code: code.into(),
            field_type,
            name: LocalizedText::new(),
            required: false,
        }
    }

    fn config(seo: bool, trash: bool) -> ModuleConfig {
        let request = GenerateModuleRequest {
            code_module: "news".into(),
            slug: "novosti".into(),
            status: "active".into(),
            name: LocalizedText::from([("ru".to_string(), "Новости".to_string())]),
            option_seo: seo,
            option_trash: trash,
            properties: vec![
                property("title", FieldType::String),
                property("body", FieldType::Text),
                property("views", FieldType::Integer),
                property("price", FieldType::Decimal),
            ],
            ..Default::default()
        };
        build_config(&request, Path::new("/m")).unwrap()
    }

    #[test]
    fn web_routes_without_trash() {
        let table = web_routes(&config(false, false));
        assert_eq!(
            table.names(),
            vec![
                "admin.news.index",
                "admin.news.create",
                "admin.news.store",
                "admin.news.edit",
                "admin.news.update",
                "admin.news.destroy",
            ]
        );
        assert!(!table.has(RouteAction::TrashIndex));
        assert_eq!(
            table.find(RouteAction::Edit).unwrap().path,
            "/news/{id}/edit"
        );
    }

    #[test]
    fn trash_adds_four_routes() {
        let table = web_routes(&config(false, true));
        assert_eq!(table.routes.len(), 10);
        assert!(table.names().contains(&"admin.news.trash.index"));
        assert!(table.names().contains(&"admin.news.trash.restore"));
        assert!(table.names().contains(&"admin.news.trash.force"));
        assert!(table.names().contains(&"admin.news.trash.empty"));
        assert_eq!(
            table.find(RouteAction::TrashEmpty).unwrap().method,
            HttpMethod::Post
        );
    }

    #[test]
    fn api_routes_are_index_and_show() {
        let table = api_routes(&config(false, false));
        assert_eq!(table.names(), vec!["api.news.index", "api.news.show"]);
        assert_eq!(table.routes[1].path, "/api/news/{id}");
    }

    #[test]
    fn search_fields_are_textual_only() {
        assert_eq!(
            search_fields(&config(false, false).descriptor),
            vec!["title", "body"]
        );
    }

    #[test]
    fn search_includes_slug_only_with_seo() {
        assert_eq!(
            search_fields(&config(true, false).descriptor),
            vec!["title", "body", "slug"]
        );
    }

    #[test]
    fn listing_defaults() {
        let contract = ListingContract::for_module(&config(false, false));
        let listing = contract.resolve(&ListingParams::default()).unwrap();
        assert_eq!(listing.sort_by, "created_at");
        assert_eq!(listing.sort_order, SortOrder::Desc);
        assert_eq!(listing.per_page, 10);
        assert_eq!(listing.page, 1);
        assert_eq!(listing.offset(), 0);
        assert!(listing.search.is_none());
    }

    #[test]
    fn unknown_sort_column_rejected() {
        let contract = ListingContract::for_module(&config(false, false));
        let params = ListingParams {
            sort_by: Some("password".into()),
            ..Default::default()
        };
        assert_matches!(contract.resolve(&params), Err(CoreError::Validation(_)));
    }

    #[test]
    fn bad_sort_order_rejected() {
        let contract = ListingContract::for_module(&config(false, false));
        let params = ListingParams {
            sort_order: Some("sideways".into()),
            ..Default::default()
        };
        assert!(contract.resolve(&params).is_err());
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(clamp_per_page(Some(1000), 10), MAX_PER_PAGE);
        assert_eq!(clamp_per_page(Some(0), 10), 1);
        assert_eq!(clamp_page(Some(-3)), 1);
        assert_eq!(clamp_page(Some(i64::MAX)), MAX_PAGE);
    }

    #[test]
    fn huge_page_offset_does_not_overflow() {
        let contract = ListingContract::for_module(&config(false, false));
        let listing = contract
            .resolve(&ListingParams {
                page: Some(i64::MAX),
                per_page: Some(MAX_PER_PAGE),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(listing.page, MAX_PAGE);
        assert_eq!(listing.offset(), (MAX_PAGE - 1) * MAX_PER_PAGE);
        assert!(listing.offset() > 0);
    }

    #[test]
    fn listing_query_with_search() {
        let contract = ListingContract::for_module(&config(true, true));
        let listing = contract
            .resolve(&ListingParams {
                search: Some("50%".into()),
                sort_by: Some("title".into()),
                sort_order: Some("ASC".into()),
                per_page: Some(5),
                page: Some(3),
            })
            .unwrap();
        let query = build_listing_query(&contract, &listing, RowScope::Live);

        assert_eq!(
            query.select_sql,
            "SELECT to_jsonb(t) FROM \"news\" t WHERE t.\"deleted_at\" IS NULL AND \
             (t.\"title\" ILIKE $1 OR t.\"body\" ILIKE $1 OR t.\"slug\" ILIKE $1) \
             ORDER BY t.\"title\" ASC, t.\"id\" ASC LIMIT 5 OFFSET 10"
        );
        assert_eq!(
            query.count_sql,
            "SELECT COUNT(*) FROM \"news\" t WHERE t.\"deleted_at\" IS NULL AND \
             (t.\"title\" ILIKE $1 OR t.\"body\" ILIKE $1 OR t.\"slug\" ILIKE $1)"
        );
        assert_eq!(query.binds, vec!["%50\\%%".to_string()]);
    }

    #[test]
    fn listing_query_without_soft_deletes_has_no_scope() {
        let contract = ListingContract::for_module(&config(false, false));
        let listing = contract.resolve(&ListingParams::default()).unwrap();
        let query = build_listing_query(&contract, &listing, RowScope::Live);
        assert!(!query.select_sql.contains("WHERE"));
        assert!(query.binds.is_empty());
    }

    #[test]
    fn trashed_scope() {
        assert_eq!(
            scope_predicate("t", true, RowScope::Trashed).as_deref(),
            Some("t.\"deleted_at\" IS NOT NULL")
        );
        assert_eq!(scope_predicate("t", false, RowScope::Trashed), None);
    }

    #[test]
    fn surface_carries_named_validators() {
        let surface = surface_definition(&config(false, false));
        assert_eq!(surface.controller, "NewsController");
        assert_eq!(surface.api_controller, "NewsApiController");
        assert_eq!(surface.store_request.name, "StoreNewsRequest");
        assert_eq!(surface.update_request.mode, ValidationMode::Update);
    }
}
