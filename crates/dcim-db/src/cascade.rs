//! Cascade / restrict / nullify delete execution.
//!
//! Policies are declared as static data in [`dcim_core::policy`]; this
//! module resolves them against live rows. A restrict refusal happens
//! before any statement runs, and the whole mutation is issued as one
//! multi-statement request, so deletion is never partially applied.

use dcim_core::error::{DcimError, DcimResult};
use dcim_core::policy::{DeletePolicy, EntityKind, Relation, children_of};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;
use crate::query::{child_ids, ensure_exists};

/// Outcome of a pre-delete policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteCheck {
    pub allowed: bool,
    /// Live rows blocking deletion under a restrict policy.
    pub blocking: u64,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// First restrict relation with live dependents, if any.
async fn restrict_blockers<C: Connection>(
    db: &Surreal<C>,
    kind: EntityKind,
    id: &str,
) -> Result<Option<(&'static Relation, u64)>, DbError> {
    for rel in children_of(kind).filter(|r| r.on_delete == DeletePolicy::Restrict) {
        let sql = format!(
            "SELECT count() AS total FROM {} WHERE {} = $id GROUP ALL",
            rel.child.table(),
            rel.foreign_key
        );
        let mut result = db.query(&sql).bind(("id", id.to_string())).await?;
        let rows: Vec<CountRow> = result.take(0)?;
        let total = rows.first().map(|r| r.total).unwrap_or(0);
        if total > 0 {
            return Ok(Some((rel, total)));
        }
    }
    Ok(None)
}

/// Check whether `kind`/`id` may be deleted under the restrict rules,
/// without touching anything.
pub async fn can_delete<C: Connection>(
    db: &Surreal<C>,
    kind: EntityKind,
    id: Uuid,
) -> DcimResult<DeleteCheck> {
    let id = id.to_string();
    ensure_exists(db, kind, &id).await.map_err(DcimError::from)?;

    Ok(match restrict_blockers(db, kind, &id).await.map_err(DcimError::from)? {
        Some((_, blocking)) => DeleteCheck {
            allowed: false,
            blocking,
        },
        None => DeleteCheck {
            allowed: true,
            blocking: 0,
        },
    })
}

/// Delete `kind`/`id`, applying the declared policies: restrict rules
/// refuse with the dependent count, cascade children are removed
/// transitively, and references into the deleted subtree are cleared.
pub async fn delete_entity<C: Connection>(
    db: &Surreal<C>,
    kind: EntityKind,
    id: Uuid,
) -> DcimResult<()> {
    let root_id = id.to_string();
    ensure_exists(db, kind, &root_id)
        .await
        .map_err(DcimError::from)?;

    if let Some((rel, blocking)) = restrict_blockers(db, kind, &root_id)
        .await
        .map_err(DcimError::from)?
    {
        return Err(DcimError::conflict(format!(
            "Cannot delete this {}: used by {} {}(s)",
            kind.label(),
            blocking,
            rel.child.label()
        )));
    }

    // Breadth-first over cascade edges, collecting the subtree's ids.
    // Restrict parents are never cascade descendants (unit-tested in
    // the policy module), so the check above covers the whole walk.
    let mut levels: Vec<(EntityKind, Vec<String>)> = vec![(kind, vec![root_id.clone()])];
    let mut i = 0;
    while i < levels.len() {
        let (parent_kind, parent_ids) = levels[i].clone();
        for rel in children_of(parent_kind).filter(|r| r.on_delete == DeletePolicy::Cascade) {
            let ids = child_ids(db, rel.child.table(), rel.foreign_key, &parent_ids)
                .await
                .map_err(DcimError::from)?;
            if !ids.is_empty() {
                levels.push((rel.child, ids));
            }
        }
        i += 1;
    }

    // One request = one transaction: clear references into the subtree
    // first, then delete bottom-up.
    let mut statements: Vec<String> = Vec::new();
    let mut bindings: Vec<(String, Vec<String>)> = Vec::new();

    for (idx, (level_kind, ids)) in levels.iter().enumerate() {
        for rel in children_of(*level_kind).filter(|r| r.on_delete == DeletePolicy::Nullify) {
            let key = format!("n{idx}_{}", rel.foreign_key);
            statements.push(format!(
                "UPDATE {} SET {} = NONE, updated_at = time::now() \
                 WHERE {} IN ${key}",
                rel.child.table(),
                rel.foreign_key,
                rel.foreign_key
            ));
            bindings.push((key, ids.clone()));
        }
    }

    for (idx, (level_kind, ids)) in levels.iter().enumerate().rev() {
        let key = format!("d{idx}");
        statements.push(format!(
            "DELETE {} WHERE meta::id(id) IN ${key}",
            level_kind.table()
        ));
        bindings.push((key, ids.clone()));
    }

    let sql = statements.join("; ");
    let mut query = db.query(&sql);
    for (key, ids) in bindings {
        query = query.bind((key, ids));
    }
    query
        .await
        .map_err(DbError::from)
        .map_err(DcimError::from)?
        .check()
        .map_err(|e| DcimError::Database(e.to_string()))?;

    debug!(
        kind = kind.label(),
        id = %root_id,
        levels = levels.len(),
        "entity deleted"
    );
    Ok(())
}
