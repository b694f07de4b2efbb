use crate::index::types::{ActionRecord, FieldValue, IndexSnapshot, parse_number};
use crate::query::parser::{Literal, Operator, Predicate, QueryAst};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Output of one query
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub results: Vec<Arc<ActionRecord>>,
    /// Matches before truncation to the limit
    pub total_matches: usize,
    pub query_time_ms: f64,
    pub cache_hit: bool,
}

/// Query executor over one snapshot
pub struct QueryExecutor<'a> {
    snapshot: &'a IndexSnapshot,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(snapshot: &'a IndexSnapshot) -> Self {
        Self { snapshot }
    }

    /// Scan every record in snapshot order. `limit == 0` means unlimited.
    pub fn execute(&self, ast: &QueryAst, limit: usize) -> QueryResult {
        let start = Instant::now();

        let mut results = Vec::new();
        let mut total_matches = 0;
        for record in self.snapshot.records.iter().filter(|r| ast.matches(r)) {
            total_matches += 1;
            if limit == 0 || results.len() < limit {
                results.push(Arc::clone(record));
            }
        }

        QueryResult {
            results,
            total_matches,
            query_time_ms: start.elapsed().as_secs_f64() * 1000.0,
            cache_hit: false,
        }
    }
}

/// Convenience wrapper over [`QueryExecutor::execute`]
pub fn evaluate(ast: &QueryAst, snapshot: &IndexSnapshot, limit: usize) -> QueryResult {
    QueryExecutor::new(snapshot).execute(ast, limit)
}

impl QueryAst {
    pub fn matches(&self, record: &ActionRecord) -> bool {
        if let Some(type_name) = &self.type_filter {
            if record.action_type != *type_name {
                return false;
            }
        }
        self.predicates.iter().all(|p| p.matches(record))
    }
}

impl Predicate {
    /// Evaluate against one record. Absent fields never match.
    pub fn matches(&self, record: &ActionRecord) -> bool {
        match record.field(&self.field) {
            Some(value) => compare(value, self.operator, &self.literal),
            None => false,
        }
    }
}

fn compare(value: FieldValue<'_>, op: Operator, literal: &Literal) -> bool {
    match op {
        Operator::Contains => contains(value, literal),
        Operator::Gt | Operator::Lt | Operator::Ge | Operator::Le => {
            let Some(rhs) = literal_number(literal) else {
                return false;
            };
            let Some(lhs) = value.as_f64() else {
                return false;
            };
            match op {
                Operator::Gt => lhs > rhs,
                Operator::Lt => lhs < rhs,
                Operator::Ge => lhs >= rhs,
                _ => lhs <= rhs,
            }
        }
        Operator::Eq | Operator::Ne => {
            let Some(equal) = equals(value, literal) else {
                return false;
            };
            if op == Operator::Eq { equal } else { !equal }
        }
    }
}

/// `None` when the two sides are not comparable
fn equals(value: FieldValue<'_>, literal: &Literal) -> Option<bool> {
    match literal {
        Literal::Number(n) => value.as_f64().map(|v| v == *n),
        Literal::Bool(b) => value.as_bool().map(|v| v == *b),
        Literal::Str(s) => value.as_text().map(|v| v == *s),
    }
}

fn literal_number(literal: &Literal) -> Option<f64> {
    match literal {
        Literal::Number(n) => Some(*n),
        Literal::Str(s) => parse_number(s),
        Literal::Bool(_) => None,
    }
}

/// Case-insensitive substring; lists match when any scalar element does
fn contains(value: FieldValue<'_>, literal: &Literal) -> bool {
    let needle = match literal {
        Literal::Str(s) => s.to_lowercase(),
        other => other.to_string().to_lowercase(),
    };

    match value {
        FieldValue::Json(Value::Array(items)) => items.iter().any(|item| {
            FieldValue::Json(item)
                .as_text()
                .is_some_and(|text| text.to_lowercase().contains(&needle))
        }),
        other => other
            .as_text()
            .is_some_and(|text| text.to_lowercase().contains(&needle)),
    }
}
