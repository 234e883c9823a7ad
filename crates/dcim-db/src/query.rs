//! Shared list-query execution and row-level helpers.
//!
//! Every repository funnels its list endpoint through [`ListQuery`]: the
//! repository contributes exact-match and search conditions, the engine
//! owns pagination, whitelisted ordering with an id tie-break, and the
//! separate count query. The scoped-uniqueness and existence checks used
//! by every create/update path live here as well.

use dcim_core::policy::EntityKind;
use dcim_core::query::ResolvedOptions;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Row struct for id-only projections.
#[derive(Debug, SurrealValue)]
pub(crate) struct IdRow {
    pub record_id: String,
}

/// Accumulates WHERE conditions and their bindings for one list query.
pub(crate) struct ListQuery {
    table: &'static str,
    conditions: Vec<String>,
    strings: Vec<(String, String)>,
    lists: Vec<(String, Vec<String>)>,
}

impl ListQuery {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            conditions: Vec::new(),
            strings: Vec::new(),
            lists: Vec::new(),
        }
    }

    /// Raw condition without bindings (e.g. `deleted_at IS NONE`).
    pub fn raw(&mut self, condition: &str) {
        self.conditions.push(condition.to_string());
    }

    /// Exact-match equality, applied only when a value is present.
    pub fn eq(&mut self, column: &'static str, value: Option<String>) {
        if let Some(value) = value {
            let key = format!("w_{column}");
            self.conditions.push(format!("{column} = ${key}"));
            self.strings.push((key, value));
        }
    }

    /// Case-insensitive substring match across the given columns.
    pub fn search(&mut self, columns: &'static [&'static str], needle: Option<String>) {
        self.search_or_related(columns, needle, None);
    }

    /// Like [`ListQuery::search`], with an extra disjunct matching a
    /// foreign key against ids pre-resolved from a related table. This
    /// is how a search reaches into a joined model without ever joining:
    /// the page query stays single-table, so rows cannot duplicate.
    pub fn search_or_related(
        &mut self,
        columns: &'static [&'static str],
        needle: Option<String>,
        related: Option<(&'static str, Vec<String>)>,
    ) {
        let Some(needle) = needle else { return };

        let mut parts: Vec<String> = columns
            .iter()
            .map(|col| format!("string::contains(string::lowercase({col} ?? ''), $search)"))
            .collect();
        if let Some((foreign_key, ids)) = related {
            parts.push(format!("{foreign_key} IN $search_related"));
            self.lists.push(("search_related".into(), ids));
        }

        self.conditions.push(format!("({})", parts.join(" OR ")));
        self.strings.push(("search".into(), needle.to_lowercase()));
    }

    /// Membership of a column in a precomputed id set.
    pub fn id_in(&mut self, column: &'static str, ids: Vec<String>) {
        let key = format!("w_{column}_in");
        self.conditions.push(format!("{column} IN ${key}"));
        self.lists.push((key, ids));
    }

    fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    /// Run the count query and the page query, returning the page rows
    /// and the total matching count.
    pub async fn run<C, R>(
        self,
        db: &Surreal<C>,
        options: &ResolvedOptions,
    ) -> Result<(Vec<R>, u64), DbError>
    where
        C: Connection,
        R: SurrealValue,
    {
        let where_clause = self.where_clause();

        let count_sql = format!(
            "SELECT count() AS total FROM {}{} GROUP ALL",
            self.table, where_clause
        );
        let mut count_query = db.query(&count_sql);
        for (key, value) in &self.strings {
            count_query = count_query.bind((key.clone(), value.clone()));
        }
        for (key, values) in &self.lists {
            count_query = count_query.bind((key.clone(), values.clone()));
        }
        let mut count_result = count_query.await?;
        let count_rows: Vec<CountRow> = count_result.take(0)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        // Tie-break on id so identical inputs always yield the same page.
        let select_sql = format!(
            "SELECT meta::id(id) AS record_id, * FROM {}{} \
             ORDER BY {} {}, id ASC LIMIT $limit START $offset",
            self.table,
            where_clause,
            options.sort_by,
            options.order.as_sql(),
        );
        let mut select_query = db
            .query(&select_sql)
            .bind(("limit", options.limit))
            .bind(("offset", options.offset()));
        for (key, value) in self.strings {
            select_query = select_query.bind((key, value));
        }
        for (key, values) in self.lists {
            select_query = select_query.bind((key, values));
        }
        let mut result = select_query.await?;
        let rows: Vec<R> = result.take(0)?;

        Ok((rows, total))
    }
}

/// Fail with `NotFound` unless the referenced row exists.
pub(crate) async fn ensure_exists<C: Connection>(
    db: &Surreal<C>,
    kind: EntityKind,
    id: &str,
) -> Result<(), DbError> {
    let sql = format!(
        "SELECT meta::id(id) AS record_id FROM type::record('{}', $id)",
        kind.table()
    );
    let mut result = db.query(&sql).bind(("id", id.to_string())).await?;
    let rows: Vec<IdRow> = result.take(0)?;
    if rows.is_empty() {
        return Err(DbError::NotFound {
            entity: kind.label().into(),
            id: id.into(),
        });
    }
    Ok(())
}

/// Scoped-uniqueness check. Every (field, value) pair narrows the scope;
/// `exclude_id` skips the record itself so a rename to its own current
/// name succeeds. Never mutates; the compound unique indexes in the
/// schema remain the concurrency backstop.
pub(crate) async fn ensure_unique<C: Connection>(
    db: &Surreal<C>,
    table: &'static str,
    fields: &[(&'static str, &str)],
    exclude_id: Option<&str>,
    conflict: &str,
) -> Result<(), DbError> {
    let mut conditions: Vec<String> = fields
        .iter()
        .map(|(field, _)| format!("{field} = $u_{field}"))
        .collect();
    if exclude_id.is_some() {
        conditions.push("meta::id(id) != $u_exclude".into());
    }

    let sql = format!(
        "SELECT meta::id(id) AS record_id FROM {table} WHERE {} LIMIT 1",
        conditions.join(" AND ")
    );
    let mut query = db.query(&sql);
    for (field, value) in fields {
        query = query.bind((format!("u_{field}"), value.to_string()));
    }
    if let Some(exclude) = exclude_id {
        query = query.bind(("u_exclude", exclude.to_string()));
    }

    let mut result = query.await?;
    let rows: Vec<IdRow> = result.take(0)?;
    if rows.is_empty() {
        Ok(())
    } else {
        Err(DbError::Conflict(conflict.to_string()))
    }
}

/// Ids of `table` rows whose `foreign_key` lies in `parent_ids`.
pub(crate) async fn child_ids<C: Connection>(
    db: &Surreal<C>,
    table: &'static str,
    foreign_key: &'static str,
    parent_ids: &[String],
) -> Result<Vec<String>, DbError> {
    let sql =
        format!("SELECT meta::id(id) AS record_id FROM {table} WHERE {foreign_key} IN $parent_ids");
    let mut result = db
        .query(&sql)
        .bind(("parent_ids", parent_ids.to_vec()))
        .await?;
    let rows: Vec<IdRow> = result.take(0)?;
    Ok(rows.into_iter().map(|r| r.record_id).collect())
}
