//! Field auto-population from the request context.
//!
//! A registry built once at startup maps entity columns to context values.
//! Before every insert/update the repository runs the applicable entries,
//! filling a column only when the write does not already provide a value -
//! an explicitly provided value always wins, so privileged callers (e.g.
//! migrations) can override auto-population.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::Value;

use crate::context::{self, ContextError, RequestContext};
use crate::database::entity::EntityDef;
use crate::database::record::Record;

/// Which write events a preset field participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOn {
    Insert,
    Update,
    All,
}

/// The persistence-layer write event being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteEvent {
    Insert,
    Update,
}

impl ApplyOn {
    fn applies_to(self, event: WriteEvent) -> bool {
        match self {
            ApplyOn::All => true,
            ApplyOn::Insert => event == WriteEvent::Insert,
            ApplyOn::Update => event == WriteEvent::Update,
        }
    }
}

/// A context value a preset field can draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKey {
    TenantId,
    UserId,
    RequestId,
}

impl ContextKey {
    fn read(self, ctx: &RequestContext) -> Option<Value> {
        match self {
            ContextKey::TenantId => ctx.tenant_id.clone().map(Value::String),
            ContextKey::UserId => ctx.user_id.clone().map(Value::String),
            ContextKey::RequestId => Some(Value::String(ctx.request_id.clone())),
        }
    }
}

/// One registered auto-populated column.
#[derive(Debug, Clone)]
pub struct PresetField {
    pub entity: &'static str,
    pub column: &'static str,
    pub key: ContextKey,
    pub apply_on: ApplyOn,
}

#[derive(Debug, Default)]
pub struct PresetRegistry {
    by_entity: HashMap<&'static str, Vec<PresetField>>,
}

impl PresetRegistry {
    pub fn new(fields: Vec<PresetField>) -> Self {
        let mut by_entity: HashMap<&'static str, Vec<PresetField>> = HashMap::new();
        for field in fields {
            by_entity.entry(field.entity).or_default().push(field);
        }
        Self { by_entity }
    }

    pub fn fields_for(&self, entity: &str) -> &[PresetField] {
        self.by_entity
            .get(entity)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Fill applicable registered columns from the request context when the
    /// record does not already carry a value for them.
    pub fn apply(
        &self,
        def: &EntityDef,
        record: &mut Record,
        event: WriteEvent,
    ) -> Result<(), ContextError> {
        let fields = self.fields_for(def.entity);
        if fields.is_empty() {
            return Ok(());
        }

        let ctx = context::get()?;

        for field in fields {
            if !field.apply_on.applies_to(event) {
                continue;
            }
            if record.has_value(field.column) {
                continue;
            }
            if let Some(value) = field.key.read(&ctx) {
                record.set_if_absent(field.column, value);
            }
        }

        Ok(())
    }
}

static REGISTRY: OnceLock<PresetRegistry> = OnceLock::new();

/// Install the process-wide registry. Called once at startup; later calls
/// are ignored.
pub fn install(fields: Vec<PresetField>) {
    let _ = REGISTRY.set(PresetRegistry::new(fields));
}

/// The installed registry, empty when none was installed.
pub fn registry() -> &'static PresetRegistry {
    static EMPTY: OnceLock<PresetRegistry> = OnceLock::new();
    REGISTRY
        .get()
        .unwrap_or_else(|| EMPTY.get_or_init(PresetRegistry::default))
}

/// The default preset wiring for the bundled entities.
pub fn default_preset_fields() -> Vec<PresetField> {
    vec![
        PresetField {
            entity: "Article",
            column: "tenant_id",
            key: ContextKey::TenantId,
            apply_on: ApplyOn::All,
        },
        PresetField {
            entity: "Article",
            column: "author_id",
            key: ContextKey::UserId,
            apply_on: ApplyOn::Insert,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entity::{Article, TenantEntity};
    use serde_json::json;

    fn registry() -> PresetRegistry {
        PresetRegistry::new(default_preset_fields())
    }

    fn seeded_context() -> RequestContext {
        RequestContext {
            request_id: "req-1".to_string(),
            user_id: Some("user-1".to_string()),
            jwt_payload: None,
            tenant_id: Some("tenant-1".to_string()),
            auth_header: None,
        }
    }

    #[tokio::test]
    async fn fills_unset_columns_from_context() {
        context::scope(seeded_context(), async {
            let registry = registry();
            let mut record = Record::from_api_input(json!({"title": "hello"})).unwrap();

            registry
                .apply(&Article::DEF, &mut record, WriteEvent::Insert)
                .unwrap();

            assert_eq!(record.get("tenant_id"), Some(&json!("tenant-1")));
            assert_eq!(record.get("author_id"), Some(&json!("user-1")));
        })
        .await;
    }

    #[tokio::test]
    async fn never_overwrites_provided_values() {
        context::scope(seeded_context(), async {
            let registry = registry();
            let mut record =
                Record::from_value(json!({"title": "hello", "tenant_id": "other-tenant"})).unwrap();

            registry
                .apply(&Article::DEF, &mut record, WriteEvent::Insert)
                .unwrap();
            assert_eq!(record.get("tenant_id"), Some(&json!("other-tenant")));

            // Applying twice never changes a field set by the first pass
            registry
                .apply(&Article::DEF, &mut record, WriteEvent::Insert)
                .unwrap();
            assert_eq!(record.get("tenant_id"), Some(&json!("other-tenant")));
            assert_eq!(record.get("author_id"), Some(&json!("user-1")));
        })
        .await;
    }

    #[tokio::test]
    async fn insert_only_fields_skip_updates() {
        context::scope(seeded_context(), async {
            let registry = registry();
            let mut record = Record::from_api_input(json!({"title": "hello"})).unwrap();

            registry
                .apply(&Article::DEF, &mut record, WriteEvent::Update)
                .unwrap();

            // tenant_id applies to ALL, author_id only to INSERT
            assert_eq!(record.get("tenant_id"), Some(&json!("tenant-1")));
            assert_eq!(record.get("author_id"), None);
        })
        .await;
    }

    #[tokio::test]
    async fn unregistered_entities_are_untouched_outside_context() {
        // No registered fields means no context read, so this must succeed
        // even outside a request scope
        let registry = PresetRegistry::new(vec![]);
        let mut record = Record::from_api_input(json!({"title": "hello"})).unwrap();
        registry
            .apply(&Article::DEF, &mut record, WriteEvent::Insert)
            .unwrap();
        assert_eq!(record.get("tenant_id"), None);
    }
}
