use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::FromRow;

/// Static description of a persisted entity type, consulted by the
/// repository and the persistence hooks.
#[derive(Debug, Clone, Copy)]
pub struct EntityDef {
    /// Logical entity name, the key into the preset-field registry.
    pub entity: &'static str,
    pub table: &'static str,
    /// Whether the table carries a `version` column and participates in
    /// optimistic locking.
    pub versioned: bool,
}

/// A tenant-scoped persisted entity. Every backing table carries a
/// `tenant_id` column (indexed, not null), audit timestamps, a nullable
/// `deleted_at`, and - for versioned entities - a numeric `version`.
pub trait TenantEntity:
    for<'r> FromRow<'r, PgRow> + Serialize + Send + Unpin
{
    const DEF: EntityDef;
}

/// Sample tenant-scoped entity used to exercise the pipeline end to end.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Article {
    pub id: String,
    pub tenant_id: String,
    pub title: String,
    pub body: String,
    /// Auto-populated from the authenticated user when not provided.
    pub author_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl TenantEntity for Article {
    const DEF: EntityDef = EntityDef {
        entity: "Article",
        table: "articles",
        versioned: true,
    };
}
