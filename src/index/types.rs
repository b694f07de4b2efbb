use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// One action of one skill document, flattened for scanning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Path relative to the corpus root, `/` separated
    pub skill_file: String,
    pub skill_name: String,
    pub track_name: String,
    pub track_index: usize,
    pub track_enabled: bool,
    pub action_index: usize,
    pub frame: i64,
    pub duration: i64,
    pub enabled: bool,
    pub action_type: String,
    /// Locator of the action within its document
    pub json_path: String,
    pub parameters: Value,
    pub summary: String,
}

impl ActionRecord {
    /// Resolve a field by name: surface attributes first, then parameters.
    ///
    /// Dotted names descend into nested parameter maps. Returns `None` when
    /// the field is absent.
    pub fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        let surface = match name {
            "skill_file" => FieldValue::Str(&self.skill_file),
            "skill_name" => FieldValue::Str(&self.skill_name),
            "track_name" => FieldValue::Str(&self.track_name),
            "track_index" => FieldValue::Int(self.track_index as i64),
            "track_enabled" => FieldValue::Bool(self.track_enabled),
            "action_index" => FieldValue::Int(self.action_index as i64),
            "frame" => FieldValue::Int(self.frame),
            "duration" => FieldValue::Int(self.duration),
            "enabled" => FieldValue::Bool(self.enabled),
            "action_type" => FieldValue::Str(&self.action_type),
            "json_path" => FieldValue::Str(&self.json_path),
            "summary" => FieldValue::Str(&self.summary),
            _ => return self.parameter(name).map(FieldValue::Json),
        };
        Some(surface)
    }

    /// Look up a (possibly dotted) parameter key.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        if let Some(v) = self.parameters.get(name) {
            return Some(v);
        }
        let mut current = &self.parameters;
        for part in name.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }
}

/// A resolved field, borrowed from the record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Str(&'a str),
    Int(i64),
    Bool(bool),
    Json(&'a Value),
}

impl FieldValue<'_> {
    /// Numeric view: numbers, and strings that parse as numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(n) => Some(*n as f64),
            FieldValue::Str(s) => parse_number(s),
            FieldValue::Bool(_) => None,
            FieldValue::Json(Value::Number(n)) => n.as_f64(),
            FieldValue::Json(Value::String(s)) => parse_number(s),
            FieldValue::Json(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) | FieldValue::Json(Value::Bool(b)) => Some(*b),
            FieldValue::Str(s) => parse_bool(s),
            FieldValue::Json(Value::String(s)) => parse_bool(s),
            _ => None,
        }
    }

    /// String form of scalar values. Lists, maps and null have none.
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Str(s) => Some((*s).to_string()),
            FieldValue::Int(n) => Some(n.to_string()),
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Json(v) => scalar_text(v),
        }
    }
}

/// Finite numeric value of a string; `inf` and `NaN` spellings don't count
pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// String form of a scalar JSON value.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A file that could not be indexed, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedFile {
    pub file: String,
    pub reason: String,
}

/// Per-file bookkeeping used to decide what an incremental build must reparse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file: String,
    /// Modification time (ns since epoch) and byte length
    pub change_marker: (u64, u64),
    pub action_count: usize,
    #[serde(default)]
    pub skipped_actions: usize,
    pub failed: bool,
}

/// Outcome of one `build_index` call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexBuildStats {
    pub total_files: usize,
    pub indexed_files: usize,
    /// Files whose records were carried over from the previous snapshot
    pub reused_files: usize,
    pub total_actions: usize,
    /// Malformed action entries dropped during flattening
    pub skipped_actions: usize,
    pub failed_files: Vec<FailedFile>,
    pub elapsed_ms: f64,
}

/// One immutable generation of the index.
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    pub records: Vec<Arc<ActionRecord>>,
    pub total_files: usize,
    pub indexed_files: usize,
    pub total_actions: usize,
    pub failed_files: Vec<FailedFile>,
    /// Unix seconds
    pub build_timestamp: u64,
    pub manifest: Vec<ManifestEntry>,
    locators: AHashMap<(String, String), usize>,
}

impl IndexSnapshot {
    pub fn new(
        records: Vec<Arc<ActionRecord>>,
        manifest: Vec<ManifestEntry>,
        failed_files: Vec<FailedFile>,
        build_timestamp: u64,
    ) -> Self {
        let locators = records
            .iter()
            .enumerate()
            .map(|(pos, r)| ((r.skill_file.clone(), r.json_path.clone()), pos))
            .collect();
        let indexed_files = manifest.iter().filter(|m| !m.failed).count();

        Self {
            total_actions: records.len(),
            total_files: manifest.len(),
            indexed_files,
            records,
            failed_files,
            build_timestamp,
            manifest,
            locators,
        }
    }

    /// Position of the record with the given composite key.
    pub fn position(&self, skill_file: &str, json_path: &str) -> Option<usize> {
        self.locators
            .get(&(skill_file.to_string(), json_path.to_string()))
            .copied()
    }

    pub fn get(&self, skill_file: &str, json_path: &str) -> Option<&Arc<ActionRecord>> {
        self.position(skill_file, json_path)
            .map(|pos| &self.records[pos])
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Format the locator for an action slot.
pub fn json_path(track_index: usize, action_index: usize) -> String {
    format!("tracks[{}].actions[{}]", track_index, action_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(params: Value) -> ActionRecord {
        ActionRecord {
            skill_file: "fire.json".into(),
            skill_name: "Fireball".into(),
            track_name: "Main".into(),
            track_index: 0,
            track_enabled: true,
            action_index: 2,
            frame: 12,
            duration: 4,
            enabled: true,
            action_type: "DamageAction".into(),
            json_path: json_path(0, 2),
            parameters: params,
            summary: String::new(),
        }
    }

    #[test]
    fn test_surface_fields_win_over_parameters() {
        let r = record(json!({ "frame": 99 }));
        assert_eq!(r.field("frame"), Some(FieldValue::Int(12)));
    }

    #[test]
    fn test_nested_parameter_lookup() {
        let r = record(json!({ "target": { "radius": 2.5 } }));
        let v = r.field("target.radius").unwrap();
        assert_eq!(v.as_f64(), Some(2.5));
        assert!(r.field("target.missing").is_none());
    }

    #[test]
    fn test_dotted_key_literal_match_first() {
        let r = record(json!({ "a.b": 1, "a": { "b": 2 } }));
        assert_eq!(r.field("a.b").unwrap().as_f64(), Some(1.0));
    }

    #[test]
    fn test_numeric_string_coercion() {
        let v = json!(" 42 ");
        assert_eq!(FieldValue::Json(&v).as_f64(), Some(42.0));
        let b = json!(true);
        assert_eq!(FieldValue::Json(&b).as_f64(), None);
    }

    #[test]
    fn test_non_finite_strings_are_not_numeric() {
        for text in ["inf", "Infinity", "-INF", "NaN", "nan"] {
            let v = json!(text);
            assert_eq!(FieldValue::Json(&v).as_f64(), None, "{}", text);
            assert_eq!(FieldValue::Str(text).as_f64(), None, "{}", text);
        }
        assert_eq!(parse_number("1e3"), Some(1000.0));
    }

    #[test]
    fn test_snapshot_locators() {
        let snap = IndexSnapshot::new(vec![Arc::new(record(json!({})))], Vec::new(), Vec::new(), 0);
        assert_eq!(snap.position("fire.json", "tracks[0].actions[2]"), Some(0));
        assert!(snap.get("fire.json", "tracks[0].actions[3]").is_none());
        assert_eq!(snap.total_actions, 1);
    }
}
