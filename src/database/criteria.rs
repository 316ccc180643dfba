use serde_json::Value;
use sqlx::postgres::PgArguments;
use sqlx::FromRow;

/// One comparison term in a criteria object.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Eq(Value),
    In(Vec<Value>),
}

/// A conjunction of column comparisons. Columns are validated as plain
/// identifiers so criteria can never smuggle SQL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    terms: Vec<(String, Term)>,
}

#[derive(Debug, thiserror::Error)]
pub enum CriteriaError {
    #[error("Invalid column name: {0}")]
    InvalidColumn(String),
}

fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.terms.push((column.into(), Term::Eq(value.into())));
        self
    }

    pub fn within(mut self, column: impl Into<String>, values: Vec<Value>) -> Self {
        self.terms.push((column.into(), Term::In(values)));
        self
    }

    /// Whether the caller already constrains this column.
    pub fn has_column(&self, column: &str) -> bool {
        self.terms.iter().any(|(c, _)| c == column)
    }

    /// Add an equality term only when the column is not already
    /// constrained; an explicit caller-supplied term wins.
    pub fn set_if_absent(&mut self, column: &str, value: Value) {
        if !self.has_column(column) {
            self.terms.push((column.to_string(), Term::Eq(value)));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    fn validate(&self) -> Result<(), CriteriaError> {
        for (column, _) in &self.terms {
            if !is_valid_identifier(column) {
                return Err(CriteriaError::InvalidColumn(column.clone()));
            }
        }
        Ok(())
    }
}

/// Either a single criteria object or an OR of alternatives, mirroring the
/// two shapes data-access callers pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    One(Criteria),
    Any(Vec<Criteria>),
}

impl Selector {
    /// All alternatives, treating the single shape as a one-element list.
    pub fn alternatives(&self) -> &[Criteria] {
        match self {
            Selector::One(criteria) => std::slice::from_ref(criteria),
            Selector::Any(list) => list,
        }
    }

    /// Apply `f` to every alternative, preserving the selector shape.
    pub fn map_alternatives(self, mut f: impl FnMut(&mut Criteria)) -> Selector {
        match self {
            Selector::One(mut criteria) => {
                f(&mut criteria);
                Selector::One(criteria)
            }
            Selector::Any(mut list) => {
                for criteria in &mut list {
                    f(criteria);
                }
                Selector::Any(list)
            }
        }
    }
}

impl From<Criteria> for Selector {
    fn from(criteria: Criteria) -> Self {
        Selector::One(criteria)
    }
}

/// A rendered WHERE clause plus its bind parameters, in order.
#[derive(Debug, Clone)]
pub struct SqlWhere {
    pub clause: String,
    pub params: Vec<Value>,
}

impl Selector {
    /// Render to a parameterized WHERE body starting at `$<first_param>`.
    /// Alternatives join with OR, terms within one alternative with AND.
    pub fn to_where_sql(&self, first_param: usize) -> Result<SqlWhere, CriteriaError> {
        let mut params: Vec<Value> = Vec::new();
        let mut next = first_param;
        let mut alternative_sql: Vec<String> = Vec::new();

        for criteria in self.alternatives() {
            criteria.validate()?;

            let mut term_sql: Vec<String> = Vec::new();
            for (column, term) in &criteria.terms {
                match term {
                    Term::Eq(Value::Null) => {
                        term_sql.push(format!("\"{}\" IS NULL", column));
                    }
                    Term::Eq(value) => {
                        term_sql.push(format!("\"{}\" = ${}", column, next));
                        params.push(value.clone());
                        next += 1;
                    }
                    Term::In(values) => {
                        if values.is_empty() {
                            // IN () matches nothing
                            term_sql.push("FALSE".to_string());
                            continue;
                        }
                        let placeholders: Vec<String> = values
                            .iter()
                            .map(|v| {
                                let p = format!("${}", next);
                                params.push(v.clone());
                                next += 1;
                                p
                            })
                            .collect();
                        term_sql.push(format!("\"{}\" IN ({})", column, placeholders.join(", ")));
                    }
                }
            }

            if term_sql.is_empty() {
                // An unconstrained alternative matches everything
                alternative_sql.push("TRUE".to_string());
            } else {
                alternative_sql.push(term_sql.join(" AND "));
            }
        }

        let clause = match alternative_sql.len() {
            0 => "TRUE".to_string(),
            1 => alternative_sql.into_iter().next().unwrap(),
            _ => alternative_sql
                .into_iter()
                .map(|a| format!("({})", a))
                .collect::<Vec<_>>()
                .join(" OR "),
        };

        Ok(SqlWhere { clause, params })
    }
}

/// Bind a JSON value onto a plain query.
pub fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                // Postgres doesn't have u64; cast down if safe
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()), // JSONB
    }
}

/// Bind a JSON value onto a typed query.
pub fn bind_value_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        Value::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                q.bind(i)
            } else if let Some(u) = n.as_u64() {
                q.bind(u as i64)
            } else if let Some(f) = n.as_f64() {
                q.bind(f)
            } else {
                q.bind(n.to_string())
            }
        }
        Value::String(s) => q.bind(s),
        Value::Array(_) | Value::Object(_) => q.bind(v.clone()),
    }
}
