//! SQL text for the document tables.
//!
//! Each collection is a table `"<database>"."<collection>"` with the document
//! in a JSONB `resource` column. Identifiers and filter keys cannot be bound
//! as parameters, so they are quoted here; filter values always are bound.

use serde_json::Value;

use tokenvault_storage::{Collection, DocumentFilter, IndexSpec, Window};

/// A bound filter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Compared against the field's text form.
    Text(String),
    /// Compared as JSONB.
    Json(Value),
}

/// A `WHERE` predicate together with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub sql: String,
    pub values: Vec<FilterValue>,
}

/// Quotes an SQL identifier.
#[must_use]
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quotes an SQL string literal.
#[must_use]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Fully qualified table name of `collection`.
#[must_use]
pub fn table(collection: &Collection) -> String {
    format!(
        "{}.{}",
        quote_ident(&collection.database),
        quote_ident(&collection.name)
    )
}

#[must_use]
pub fn create_schema(collection: &Collection) -> String {
    format!(
        "CREATE SCHEMA IF NOT EXISTS {}",
        quote_ident(&collection.database)
    )
}

#[must_use]
pub fn create_table(collection: &Collection) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS {} (
            id TEXT PRIMARY KEY,
            resource JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"#,
        table(collection)
    )
}

/// Expression index on a top-level document field.
///
/// A sparse index only covers rows where the field is present and not null,
/// which is exactly the set of rows an equality lookup on the field can match.
#[must_use]
pub fn create_index(collection: &Collection, index: &IndexSpec) -> String {
    let field = quote_literal(&index.field);
    let mut sql = format!(
        "CREATE {unique}INDEX {concurrently}IF NOT EXISTS {name} ON {table} ((resource->>{field}))",
        unique = if index.unique { "UNIQUE " } else { "" },
        concurrently = if index.background { "CONCURRENTLY " } else { "" },
        name = quote_ident(&index.name),
        table = table(collection),
    );
    if index.sparse {
        sql.push_str(&format!(" WHERE resource->>{field} IS NOT NULL"));
    }
    sql
}

/// Builds the predicate for `filter`, numbering parameters from `first_param`.
///
/// String values compare on the field's text and JSON type, so a plain
/// expression index on the field still applies; anything else compares as
/// JSONB. An empty filter yields `TRUE`.
#[must_use]
pub fn predicate(filter: &DocumentFilter, first_param: usize) -> Predicate {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    for (field, expected) in filter.iter() {
        let param = first_param + values.len();
        let key = quote_literal(field);
        match expected {
            Value::String(text) => {
                clauses.push(format!(
                    "(resource->>{key} = ${param} AND jsonb_typeof(resource->{key}) = 'string')"
                ));
                values.push(FilterValue::Text(text.clone()));
            }
            other => {
                clauses.push(format!("resource->{key} = ${param}::jsonb"));
                values.push(FilterValue::Json(other.clone()));
            }
        }
    }

    let sql = if clauses.is_empty() {
        "TRUE".to_string()
    } else {
        clauses.join(" AND ")
    };
    Predicate { sql, values }
}

/// `LIMIT`/`OFFSET` suffix for `window`.
#[must_use]
pub fn window(window: Window) -> String {
    let mut sql = String::new();
    if let Some(limit) = window.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }
    if window.skip > 0 {
        sql.push_str(&format!(" OFFSET {}", window.skip));
    }
    sql
}

#[must_use]
pub fn select_by_id(collection: &Collection) -> String {
    format!("SELECT resource FROM {} WHERE id = $1", table(collection))
}

#[must_use]
pub fn select(collection: &Collection, predicate: &Predicate, range: Window) -> String {
    format!(
        "SELECT resource FROM {} WHERE {} ORDER BY id{}",
        table(collection),
        predicate.sql,
        window(range)
    )
}

#[must_use]
pub fn count(collection: &Collection, predicate: &Predicate) -> String {
    format!(
        "SELECT COUNT(*) FROM {} WHERE {}",
        table(collection),
        predicate.sql
    )
}

#[must_use]
pub fn upsert(collection: &Collection) -> String {
    format!(
        "INSERT INTO {} (id, resource) VALUES ($1, $2) \
         ON CONFLICT (id) DO UPDATE SET resource = EXCLUDED.resource, updated_at = NOW()",
        table(collection)
    )
}

#[must_use]
pub fn delete(collection: &Collection) -> String {
    format!("DELETE FROM {} WHERE id = $1", table(collection))
}

/// Removes the key bound as `$1` from every matching document.
///
/// `predicate` must number its parameters from 2.
#[must_use]
pub fn unset_field(collection: &Collection, predicate: &Predicate) -> String {
    format!(
        "UPDATE {} SET resource = resource - $1, updated_at = NOW() WHERE {}",
        table(collection),
        predicate.sql
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn accesses() -> Collection {
        Collection::new("oauth", "accesses")
    }

    #[test]
    fn test_quoting() {
        assert_eq!(quote_ident("oauth"), r#""oauth""#);
        assert_eq!(quote_ident(r#"we"ird"#), r#""we""ird""#);
        assert_eq!(quote_literal("o'brien"), "'o''brien'");
        assert_eq!(table(&accesses()), r#""oauth"."accesses""#);
    }

    #[test]
    fn test_sparse_background_index() {
        let index = IndexSpec::new("idx_accesses_refresh_token", "refreshToken")
            .sparse()
            .background();
        assert_eq!(
            create_index(&accesses(), &index),
            r#"CREATE INDEX CONCURRENTLY IF NOT EXISTS "idx_accesses_refresh_token" ON "oauth"."accesses" ((resource->>'refreshToken')) WHERE resource->>'refreshToken' IS NOT NULL"#
        );
    }

    #[test]
    fn test_unique_dense_index() {
        let index = IndexSpec::new("idx_clients_uri", "redirectUri").unique();
        assert_eq!(
            create_index(&Collection::new("oauth", "clients"), &index),
            r#"CREATE UNIQUE INDEX IF NOT EXISTS "idx_clients_uri" ON "oauth"."clients" ((resource->>'redirectUri'))"#
        );
    }

    #[test]
    fn test_empty_predicate() {
        let predicate = predicate(&DocumentFilter::new(), 1);
        assert_eq!(predicate.sql, "TRUE");
        assert!(predicate.values.is_empty());
    }

    #[test]
    fn test_predicate_binds_values() {
        let filter = DocumentFilter::new()
            .eq("refreshToken", "r1")
            .eq("expiresIn", 3600);
        let predicate = predicate(&filter, 2);

        // Filter fields iterate in key order.
        assert_eq!(
            predicate.sql,
            "resource->'expiresIn' = $2::jsonb AND \
             (resource->>'refreshToken' = $3 AND jsonb_typeof(resource->'refreshToken') = 'string')"
        );
        assert_eq!(
            predicate.values,
            vec![
                FilterValue::Json(json!(3600)),
                FilterValue::Text("r1".into())
            ]
        );
    }

    #[test]
    fn test_predicate_escapes_keys() {
        let filter = DocumentFilter::new().eq("x') OR ('1'='1", true);
        let predicate = predicate(&filter, 1);
        assert_eq!(
            predicate.sql,
            "resource->'x'') OR (''1''=''1' = $1::jsonb"
        );
    }

    #[test]
    fn test_select_window() {
        let predicate = predicate(&DocumentFilter::new(), 1);
        assert_eq!(
            select(&accesses(), &predicate, Window::new(10, 10)),
            r#"SELECT resource FROM "oauth"."accesses" WHERE TRUE ORDER BY id LIMIT 10 OFFSET 10"#
        );
        assert_eq!(
            select(&accesses(), &predicate, Window::all()),
            r#"SELECT resource FROM "oauth"."accesses" WHERE TRUE ORDER BY id"#
        );
    }

    #[test]
    fn test_unset_field_numbers_after_field_param() {
        let filter = DocumentFilter::new().eq("refreshToken", "r1");
        let sql = unset_field(&accesses(), &predicate(&filter, 2));
        assert!(sql.starts_with(
            r#"UPDATE "oauth"."accesses" SET resource = resource - $1, updated_at = NOW()"#
        ));
        assert!(sql.contains("= $2"));
    }

    #[test]
    fn test_upsert_replaces_wholesale() {
        let sql = upsert(&accesses());
        assert!(sql.contains("ON CONFLICT (id) DO UPDATE SET resource = EXCLUDED.resource"));
    }
}
