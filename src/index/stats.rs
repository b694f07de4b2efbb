use crate::index::types::{ActionRecord, IndexSnapshot};
use crate::query::parser::QueryAst;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Group key for records where the grouping field is absent
pub const MISSING_GROUP: &str = "<none>";

/// Count plus `avg_<key>`, `min_<key>`, `max_<key>` for every numeric parameter
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupStats {
    pub count: usize,
    #[serde(flatten)]
    pub fields: BTreeMap<String, f64>,
}

impl GroupStats {
    /// Look up a summary value such as `avg_baseDamage`
    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }

    /// Parameter keys that were summarized
    pub fn numeric_keys(&self) -> impl Iterator<Item = &str> {
        self.fields
            .keys()
            .filter_map(|k| k.strip_prefix("avg_"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsResult {
    pub group_by: String,
    pub total_actions: usize,
    pub groups: BTreeMap<String, GroupStats>,
}

#[derive(Default)]
struct NumericSummary {
    sum: f64,
    min: f64,
    max: f64,
    n: usize,
}

impl NumericSummary {
    fn add(&mut self, value: f64) {
        if self.n == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }
        self.sum += value;
        self.n += 1;
    }
}

#[derive(Default)]
struct GroupAccumulator {
    count: usize,
    numeric: BTreeMap<String, NumericSummary>,
}

impl GroupAccumulator {
    fn add(&mut self, record: &ActionRecord) {
        self.count += 1;
        let Some(params) = record.parameters.as_object() else {
            return;
        };
        for (key, value) in params {
            if let Value::Number(n) = value {
                if let Some(v) = n.as_f64() {
                    self.numeric.entry(key.clone()).or_default().add(v);
                }
            }
        }
    }

    fn finish(self) -> GroupStats {
        let mut fields = BTreeMap::new();
        for (key, summary) in self.numeric {
            fields.insert(format!("avg_{}", key), summary.sum / summary.n as f64);
            fields.insert(format!("min_{}", key), summary.min);
            fields.insert(format!("max_{}", key), summary.max);
        }
        GroupStats {
            count: self.count,
            fields,
        }
    }
}

/// Group `records` by `group_by` and summarize each group
pub fn aggregate<'a>(
    records: impl IntoIterator<Item = &'a ActionRecord>,
    group_by: &str,
) -> StatsResult {
    let mut groups: BTreeMap<String, GroupAccumulator> = BTreeMap::new();
    let mut total_actions = 0;

    for record in records {
        total_actions += 1;
        let key = record
            .field(group_by)
            .and_then(|v| v.as_text())
            .unwrap_or_else(|| MISSING_GROUP.to_string());
        groups.entry(key).or_default().add(record);
    }

    StatsResult {
        group_by: group_by.to_string(),
        total_actions,
        groups: groups
            .into_iter()
            .map(|(key, acc)| (key, acc.finish()))
            .collect(),
    }
}

/// Aggregate the snapshot, optionally restricted to records matching `filter`
pub fn get_statistics(
    snapshot: &IndexSnapshot,
    group_by: &str,
    filter: Option<&QueryAst>,
) -> StatsResult {
    let records = snapshot
        .records
        .iter()
        .map(|r| r.as_ref())
        .filter(|r| filter.is_none_or(|ast| ast.matches(r)));
    aggregate(records, group_by)
}
