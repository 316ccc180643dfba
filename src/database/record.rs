use serde_json::{Map, Value};

/// Columns owned by the persistence layer. API input cannot set these;
/// they are filled by hooks, the repository, or database defaults.
/// `version` is deliberately absent: clients round-trip it as the
/// optimistic-concurrency token.
const SYSTEM_COLUMNS: &[&str] = &[
    "id",
    "tenant_id",
    "created_at",
    "updated_at",
    "deleted_at",
];

/// Errors that can occur during Record operations
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("System column '{0}' cannot be set via API input")]
    SystemColumnNotAllowed(String),
    #[error("Record input must be a JSON object")]
    NotAnObject,
}

/// Map-backed write model flowing through the persistence hooks. Holds the
/// column values of one pending insert or update.
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from API input, rejecting system columns.
    pub fn from_api_input(value: Value) -> Result<Self, RecordError> {
        let Value::Object(fields) = value else {
            return Err(RecordError::NotAnObject);
        };

        for column in SYSTEM_COLUMNS {
            if fields.contains_key(*column) {
                return Err(RecordError::SystemColumnNotAllowed(column.to_string()));
            }
        }

        Ok(Self { fields })
    }

    /// Build a record from trusted internal data, system columns allowed.
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        let Value::Object(fields) = value else {
            return Err(RecordError::NotAnObject);
        };
        Ok(Self { fields })
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(column.into(), value.into());
    }

    /// Set a value only when the column is absent or null. Returns whether
    /// the value was written.
    pub fn set_if_absent(&mut self, column: &str, value: Value) -> bool {
        match self.fields.get(column) {
            None | Some(Value::Null) => {
                self.fields.insert(column.to_string(), value);
                true
            }
            Some(_) => false,
        }
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.fields.remove(column)
    }

    /// True when the column is present with a non-null value.
    pub fn has_value(&self, column: &str) -> bool {
        matches!(self.fields.get(column), Some(v) if !v.is_null())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// The record's version column as an integer, if present.
    pub fn version(&self) -> Option<i64> {
        self.fields.get("version").and_then(Value::as_i64)
    }
}
