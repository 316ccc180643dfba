use std::marker::PhantomData;

use serde_json::Value;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::context::{self, ContextError};
use crate::database::criteria::{bind_value, bind_value_as, Criteria, CriteriaError, Selector};
use crate::database::entity::TenantEntity;
use crate::database::record::{Record, RecordError};
use crate::hooks::preset::{self, WriteEvent};
use crate::hooks::version_lock::{self, VersionConflict};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error(
        "Tenant id is not set for a tenant-scoped repository call, it is either missing from \
         the request or the repository is used outside of a request scope"
    )]
    MissingTenantContext,

    #[error("Version conflict, persisted entity is at version {current_version}")]
    VersionConflict { current_version: i64 },

    #[error("Record not found")]
    NotFound,

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("Query error: {0}")]
    Query(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<CriteriaError> for RepositoryError {
    fn from(err: CriteriaError) -> Self {
        RepositoryError::Query(err.to_string())
    }
}

impl From<VersionConflict> for RepositoryError {
    fn from(err: VersionConflict) -> Self {
        RepositoryError::VersionConflict {
            current_version: err.current_version,
        }
    }
}

/// Inject the context tenant id into every criteria alternative.
///
/// This is the enforcement boundary: a tenant-scoped query can never run
/// without a tenant filter. An explicitly supplied `tenant_id` term wins
/// over the context value, which lets privileged callers widen or redirect
/// the scope deliberately.
pub fn preset_tenant_selector(selector: Selector) -> Result<Selector, RepositoryError> {
    let tenant_id = match context::tenant_id() {
        Ok(Some(tenant_id)) => tenant_id,
        _ => return Err(RepositoryError::MissingTenantContext),
    };

    Ok(selector.map_alternatives(|criteria| {
        criteria.set_if_absent("tenant_id", Value::String(tenant_id.clone()));
    }))
}

fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

fn validate_columns(record: &Record) -> Result<(), RepositoryError> {
    for (column, _) in record.columns() {
        if !is_valid_identifier(column) {
            return Err(RepositoryError::Query(format!(
                "Invalid column name: {}",
                column
            )));
        }
    }
    Ok(())
}

/// Repository wrapper that scopes every operation to the tenant resolved
/// for the current request. Business code built on top of it never filters
/// by tenant manually.
pub struct TenantScopedRepository<T: TenantEntity> {
    pool: PgPool,
    _phantom: PhantomData<T>,
}

impl<T: TenantEntity> TenantScopedRepository<T> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _phantom: PhantomData,
        }
    }

    pub async fn count(&self, selector: impl Into<Selector>) -> Result<i64, RepositoryError> {
        let selector = preset_tenant_selector(selector.into())?;
        let sql_where = selector.to_where_sql(1)?;

        let query = format!(
            "SELECT COUNT(*) AS count FROM \"{}\" WHERE ({}) AND \"deleted_at\" IS NULL",
            T::DEF.table,
            sql_where.clause
        );

        let mut q = sqlx::query(&query);
        for param in sql_where.params.iter() {
            q = bind_value(q, param);
        }
        let row = q.fetch_one(&self.pool).await?;
        Ok(row.try_get("count")?)
    }

    pub async fn find_all(&self, selector: impl Into<Selector>) -> Result<Vec<T>, RepositoryError> {
        let selector = preset_tenant_selector(selector.into())?;
        let sql_where = selector.to_where_sql(1)?;

        let query = format!(
            "SELECT * FROM \"{}\" WHERE ({}) AND \"deleted_at\" IS NULL",
            T::DEF.table,
            sql_where.clause
        );

        let mut q = sqlx::query_as::<_, T>(&query);
        for param in sql_where.params.iter() {
            q = bind_value_as(q, param);
        }
        Ok(q.fetch_all(&self.pool).await?)
    }

    pub async fn find_one(
        &self,
        selector: impl Into<Selector>,
    ) -> Result<Option<T>, RepositoryError> {
        let selector = preset_tenant_selector(selector.into())?;
        let sql_where = selector.to_where_sql(1)?;

        let query = format!(
            "SELECT * FROM \"{}\" WHERE ({}) AND \"deleted_at\" IS NULL",
            T::DEF.table,
            sql_where.clause
        );

        let mut q = sqlx::query_as::<_, T>(&query);
        for param in sql_where.params.iter() {
            q = bind_value_as(q, param);
        }
        Ok(q.fetch_optional(&self.pool).await?)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<T, RepositoryError> {
        self.find_one(Criteria::new().eq("id", id))
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Insert one record. Runs the auto-population hook, then refuses to
    /// write unless a tenant id ended up on the record.
    pub async fn insert(&self, mut record: Record) -> Result<T, RepositoryError> {
        preset::registry().apply(&T::DEF, &mut record, WriteEvent::Insert)?;

        if !record.has_value("tenant_id") {
            return Err(RepositoryError::MissingTenantContext);
        }

        record.set_if_absent("id", Value::String(Uuid::new_v4().to_string()));
        validate_columns(&record)?;

        let mut columns: Vec<String> = Vec::new();
        let mut placeholders: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        for (i, (column, value)) in record.columns().enumerate() {
            columns.push(format!("\"{}\"", column));
            placeholders.push(format!("${}", i + 1));
            params.push(value.clone());
        }

        columns.push("\"created_at\"".to_string());
        placeholders.push("now()".to_string());
        columns.push("\"updated_at\"".to_string());
        placeholders.push("now()".to_string());
        if T::DEF.versioned {
            columns.push("\"version\"".to_string());
            placeholders.push("1".to_string());
        }

        let query = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({}) RETURNING *",
            T::DEF.table,
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut q = sqlx::query_as::<_, T>(&query);
        for param in params.iter() {
            q = bind_value_as(q, param);
        }
        Ok(q.fetch_one(&self.pool).await?)
    }

    /// Full update of one entity by id. Runs the auto-population hook and
    /// the optimistic-concurrency guard inside one transaction; a stale
    /// version rolls the whole write back.
    pub async fn update(&self, id: &str, mut record: Record) -> Result<T, RepositoryError> {
        preset::registry().apply(&T::DEF, &mut record, WriteEvent::Update)?;

        let selector = preset_tenant_selector(Selector::One(Criteria::new().eq("id", id)))?;
        let sql_where = selector.to_where_sql(1)?;

        let mut tx = self.pool.begin().await?;

        let select = format!(
            "SELECT {} FROM \"{}\" WHERE ({}) AND \"deleted_at\" IS NULL FOR UPDATE",
            if T::DEF.versioned { "\"version\"" } else { "\"id\"" },
            T::DEF.table,
            sql_where.clause
        );
        let mut q = sqlx::query(&select);
        for param in sql_where.params.iter() {
            q = bind_value(q, param);
        }
        let existing = q.fetch_optional(&mut *tx).await?.ok_or(RepositoryError::NotFound)?;

        if T::DEF.versioned {
            let persisted_version: i64 = existing.try_get("version")?;
            version_lock::check_version(&T::DEF, &record, persisted_version)?;
            // The token has been checked; the row owns the counter from here
            record.remove("version");
        }

        record.remove("id");
        validate_columns(&record)?;
        if record.is_empty() {
            return Err(RepositoryError::Query("Update carries no columns".to_string()));
        }

        let mut assignments: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        let mut next = 1usize;
        for (column, value) in record.columns() {
            assignments.push(format!("\"{}\" = ${}", column, next));
            params.push(value.clone());
            next += 1;
        }
        assignments.push("\"updated_at\" = now()".to_string());
        if T::DEF.versioned {
            assignments.push("\"version\" = \"version\" + 1".to_string());
        }

        let where_sql = selector.to_where_sql(next)?;
        let update = format!(
            "UPDATE \"{}\" SET {} WHERE ({}) AND \"deleted_at\" IS NULL RETURNING *",
            T::DEF.table,
            assignments.join(", "),
            where_sql.clause
        );

        let mut q = sqlx::query_as::<_, T>(&update);
        for param in params.iter() {
            q = bind_value_as(q, param);
        }
        for param in where_sql.params.iter() {
            q = bind_value_as(q, param);
        }
        let updated = q.fetch_one(&mut *tx).await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Partial update by id. Only the provided columns change; the
    /// optimistic-concurrency guard does not run on this path, which is a
    /// deliberate gap of field-level patches.
    pub async fn update_partial(&self, id: &str, mut record: Record) -> Result<T, RepositoryError> {
        let selector = preset_tenant_selector(Selector::One(Criteria::new().eq("id", id)))?;

        record.remove("id");
        record.remove("version");
        validate_columns(&record)?;
        if record.is_empty() {
            return Err(RepositoryError::Query("Update carries no columns".to_string()));
        }

        let mut assignments: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        let mut next = 1usize;
        for (column, value) in record.columns() {
            assignments.push(format!("\"{}\" = ${}", column, next));
            params.push(value.clone());
            next += 1;
        }
        assignments.push("\"updated_at\" = now()".to_string());

        let sql_where = selector.to_where_sql(next)?;
        let update = format!(
            "UPDATE \"{}\" SET {} WHERE ({}) AND \"deleted_at\" IS NULL RETURNING *",
            T::DEF.table,
            assignments.join(", "),
            sql_where.clause
        );

        let mut q = sqlx::query_as::<_, T>(&update);
        for param in params.iter() {
            q = bind_value_as(q, param);
        }
        for param in sql_where.params.iter() {
            q = bind_value_as(q, param);
        }
        q.fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Soft-delete every row matching the selector within the tenant scope.
    /// Returns the number of archived rows.
    pub async fn delete(&self, selector: impl Into<Selector>) -> Result<u64, RepositoryError> {
        let selector = preset_tenant_selector(selector.into())?;
        let sql_where = selector.to_where_sql(1)?;

        let query = format!(
            "UPDATE \"{}\" SET \"deleted_at\" = now() WHERE ({}) AND \"deleted_at\" IS NULL",
            T::DEF.table,
            sql_where.clause
        );

        let mut q = sqlx::query(&query);
        for param in sql_where.params.iter() {
            q = bind_value(q, param);
        }
        let result = q.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use serde_json::json;

    fn tenant_context(tenant_id: &str) -> RequestContext {
        RequestContext {
            request_id: "req-1".to_string(),
            user_id: Some("user-1".to_string()),
            jwt_payload: None,
            tenant_id: Some(tenant_id.to_string()),
            auth_header: None,
        }
    }

    #[tokio::test]
    async fn preset_fails_without_tenant_in_context() {
        // Outside any request scope
        let err = preset_tenant_selector(Selector::One(Criteria::new())).unwrap_err();
        assert!(matches!(err, RepositoryError::MissingTenantContext));

        // Inside a scope that never resolved a tenant
        context::scope(RequestContext::new("req-1"), async {
            let err = preset_tenant_selector(Selector::One(Criteria::new())).unwrap_err();
            assert!(matches!(err, RepositoryError::MissingTenantContext));
        })
        .await;
    }

    #[tokio::test]
    async fn preset_injects_tenant_into_every_alternative() {
        context::scope(tenant_context("tenant-1"), async {
            let selector = Selector::Any(vec![
                Criteria::new().eq("title", "a"),
                Criteria::new().eq("title", "b"),
            ]);

            let preset = preset_tenant_selector(selector).unwrap();
            for alternative in preset.alternatives() {
                assert!(alternative.has_column("tenant_id"));
            }

            let sql = preset.to_where_sql(1).unwrap();
            assert_eq!(
                sql.params
                    .iter()
                    .filter(|p| **p == json!("tenant-1"))
                    .count(),
                2
            );
        })
        .await;
    }

    #[tokio::test]
    async fn preset_keeps_caller_supplied_tenant() {
        context::scope(tenant_context("tenant-1"), async {
            let selector = Selector::One(Criteria::new().eq("tenant_id", "tenant-override"));
            let preset = preset_tenant_selector(selector).unwrap();

            let sql = preset.to_where_sql(1).unwrap();
            assert_eq!(sql.params, vec![json!("tenant-override")]);
        })
        .await;
    }

    #[tokio::test]
    async fn preset_scopes_unconstrained_queries() {
        context::scope(tenant_context("tenant-1"), async {
            // A caller passing no criteria at all still gets tenant-fenced
            let preset = preset_tenant_selector(Selector::One(Criteria::new())).unwrap();
            let sql = preset.to_where_sql(1).unwrap();
            assert_eq!(sql.clause, "\"tenant_id\" = $1");
            assert_eq!(sql.params, vec![json!("tenant-1")]);
        })
        .await;
    }
}
