use crate::error::IndexError;
use crate::index::types::{
    ActionRecord, FailedFile, IndexBuildStats, IndexSnapshot, ManifestEntry, json_path, scalar_text,
};
use ignore::WalkBuilder;
use rayon::prelude::*;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Keys of an action object that are not parameters
const STRUCTURAL_KEYS: &[&str] = &[
    "frame",
    "duration",
    "enabled",
    "actionType",
    "action_type",
    "type",
    "$type",
    "parameters",
];

/// Longest string parameter value shown in a summary
const SUMMARY_VALUE_MAX_CHARS: usize = 32;

/// Knobs for one build pass
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub summary_params: usize,
    pub parallel: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            summary_params: 3,
            parallel: true,
        }
    }
}

/// A skill document found in the corpus
#[derive(Debug, Clone)]
pub struct CorpusFile {
    pub path: PathBuf,
    /// Relative to the corpus root, `/` separated
    pub rel_path: String,
    pub change_marker: (u64, u64),
}

/// What a previous generation knew about the corpus
#[derive(Debug, Default)]
pub struct Baseline {
    manifest: HashMap<String, ManifestEntry>,
    records: HashMap<String, Vec<Arc<ActionRecord>>>,
}

impl Baseline {
    pub fn new(manifest: &[ManifestEntry], records: &[Arc<ActionRecord>]) -> Self {
        let mut by_file: HashMap<String, Vec<Arc<ActionRecord>>> = HashMap::new();
        for record in records {
            by_file
                .entry(record.skill_file.clone())
                .or_default()
                .push(Arc::clone(record));
        }

        Self {
            manifest: manifest
                .iter()
                .map(|m| (m.file.clone(), m.clone()))
                .collect(),
            records: by_file,
        }
    }

    pub fn from_snapshot(snapshot: &IndexSnapshot) -> Self {
        Self::new(&snapshot.manifest, &snapshot.records)
    }

    pub fn is_empty(&self) -> bool {
        self.manifest.is_empty()
    }

    /// Records for `file` if it is unchanged and was indexed cleanly last time.
    fn reusable(&self, file: &CorpusFile) -> Option<(Vec<Arc<ActionRecord>>, usize)> {
        let entry = self.manifest.get(&file.rel_path)?;
        if entry.failed || entry.change_marker != file.change_marker {
            return None;
        }
        let records = self.records.get(&file.rel_path).cloned().unwrap_or_default();
        (records.len() == entry.action_count).then_some((records, entry.skipped_actions))
    }
}

/// Result of handling a single corpus file
enum FileOutcome {
    Reused {
        records: Vec<Arc<ActionRecord>>,
        skipped: usize,
    },
    Parsed {
        records: Vec<Arc<ActionRecord>>,
        skipped: usize,
    },
    Failed(String),
}

/// Flattened form of one parsed document
#[derive(Debug)]
pub struct FlattenedDocument {
    pub records: Vec<ActionRecord>,
    /// Action entries dropped because they were malformed
    pub skipped: usize,
}

/// List the skill documents under `root`, sorted by relative path.
pub fn scan_corpus(root: &Path) -> Result<Vec<CorpusFile>, IndexError> {
    if !root.is_dir() {
        return Err(IndexError::CorpusNotFound(root.to_path_buf()));
    }
    fs::read_dir(root).map_err(|source| IndexError::CorpusUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(true)
        .follow_links(true)
        .build();

    let mut files: Vec<CorpusFile> = walker
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("skipping unreadable corpus entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
        .filter(|entry| is_skill_document(entry.path()))
        .filter_map(|entry| {
            let path = entry.path().to_path_buf();
            let rel_path = relative_name(root, &path)?;
            let change_marker = change_marker(&path);
            Some(CorpusFile {
                path,
                rel_path,
                change_marker,
            })
        })
        .collect();

    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    Ok(files)
}

/// Whether a path looks like a skill document (`*.json`)
pub fn is_skill_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Corpus-relative, `/` separated name of `path`
pub fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Modification time (ns) and size; zeros when metadata is unavailable
fn change_marker(path: &Path) -> (u64, u64) {
    match path.metadata() {
        Ok(meta) => {
            let mtime = meta
                .modified()
                .map(|t| t.duration_since(UNIX_EPOCH).unwrap_or_default().as_nanos() as u64)
                .unwrap_or(0);
            (mtime, meta.len())
        }
        Err(_) => (0, 0),
    }
}

/// Build a new snapshot of `root`, reusing unchanged files from `baseline`.
pub fn build_snapshot(
    root: &Path,
    baseline: &Baseline,
    options: &BuildOptions,
) -> Result<(IndexSnapshot, IndexBuildStats), IndexError> {
    let start = Instant::now();
    let files = scan_corpus(root)?;

    let process = |file: &CorpusFile| -> FileOutcome {
        if let Some((records, skipped)) = baseline.reusable(file) {
            return FileOutcome::Reused { records, skipped };
        }
        match index_file(file, options.summary_params) {
            Ok(doc) => FileOutcome::Parsed {
                records: doc.records.into_iter().map(Arc::new).collect(),
                skipped: doc.skipped,
            },
            Err(reason) => FileOutcome::Failed(reason),
        }
    };

    let outcomes: Vec<FileOutcome> = if options.parallel {
        files.par_iter().map(process).collect()
    } else {
        files.iter().map(process).collect()
    };

    let mut stats = IndexBuildStats {
        total_files: files.len(),
        ..Default::default()
    };
    let mut records = Vec::new();
    let mut manifest = Vec::with_capacity(files.len());

    for (file, outcome) in files.iter().zip(outcomes) {
        let (action_count, skipped_actions, failed) = match outcome {
            FileOutcome::Reused {
                records: file_records,
                skipped,
            } => {
                stats.reused_files += 1;
                stats.indexed_files += 1;
                stats.skipped_actions += skipped;
                let n = file_records.len();
                records.extend(file_records);
                (n, skipped, false)
            }
            FileOutcome::Parsed {
                records: file_records,
                skipped,
            } => {
                tracing::debug!(
                    "indexed {}: {} actions ({} skipped)",
                    file.rel_path,
                    file_records.len(),
                    skipped
                );
                stats.indexed_files += 1;
                stats.skipped_actions += skipped;
                let n = file_records.len();
                records.extend(file_records);
                (n, skipped, false)
            }
            FileOutcome::Failed(reason) => {
                tracing::warn!("failed to index {}: {}", file.rel_path, reason);
                stats.failed_files.push(FailedFile {
                    file: file.rel_path.clone(),
                    reason,
                });
                (0, 0, true)
            }
        };
        manifest.push(ManifestEntry {
            file: file.rel_path.clone(),
            change_marker: file.change_marker,
            action_count,
            skipped_actions,
            failed,
        });
    }

    stats.total_actions = records.len();
    stats.elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

    let snapshot = IndexSnapshot::new(records, manifest, stats.failed_files.clone(), unix_now());
    Ok((snapshot, stats))
}

/// Read and flatten one corpus file
fn index_file(file: &CorpusFile, summary_params: usize) -> Result<FlattenedDocument, String> {
    let content = fs::read(&file.path).map_err(|e| format!("read error: {}", e))?;
    let document: Value =
        serde_json::from_slice(&content).map_err(|e| format!("invalid JSON: {}", e))?;
    let stem = Path::new(&file.rel_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.rel_path.clone());
    flatten_document(&file.rel_path, &stem, &document, summary_params)
}

/// Walk a document's tracks and actions, emitting one record per valid action.
///
/// Fails only when the top-level shape is wrong; malformed actions are
/// dropped and counted.
pub fn flatten_document(
    skill_file: &str,
    default_name: &str,
    document: &Value,
    summary_params: usize,
) -> Result<FlattenedDocument, String> {
    let root = document
        .as_object()
        .ok_or_else(|| "unexpected shape: top level is not an object".to_string())?;
    let tracks = root
        .get("tracks")
        .and_then(Value::as_array)
        .ok_or_else(|| "unexpected shape: missing `tracks` array".to_string())?;

    let skill_name = string_field(root, &["skillName", "skill_name", "name"])
        .unwrap_or(default_name)
        .to_string();

    let mut records = Vec::new();
    let mut skipped = 0;

    for (track_index, track) in tracks.iter().enumerate() {
        let Some(track) = track.as_object() else {
            tracing::debug!("{}: track {} is not an object", skill_file, track_index);
            continue;
        };
        let track_name = string_field(track, &["trackName", "track_name", "name"])
            .map(str::to_string)
            .unwrap_or_else(|| format!("Track {}", track_index));
        let track_enabled = track.get("enabled").and_then(Value::as_bool).unwrap_or(true);
        let actions = track
            .get("actions")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for (action_index, action) in actions.iter().enumerate() {
            let Some(action) = action.as_object() else {
                skipped += 1;
                continue;
            };
            let Some(action_type) = resolve_action_type(action) else {
                skipped += 1;
                continue;
            };

            let frame = int_field(action, "frame");
            let duration = int_field(action, "duration");
            let parameters = parameters(action);
            let summary = summarize(&action_type, frame, duration, &parameters, summary_params);

            records.push(ActionRecord {
                skill_file: skill_file.to_string(),
                skill_name: skill_name.clone(),
                track_name: track_name.clone(),
                track_index,
                track_enabled,
                action_index,
                frame,
                duration,
                enabled: action.get("enabled").and_then(Value::as_bool).unwrap_or(true),
                action_type,
                json_path: json_path(track_index, action_index),
                parameters,
                summary,
            });
        }
    }

    Ok(FlattenedDocument { records, skipped })
}

fn string_field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn int_field(obj: &Map<String, Value>, key: &str) -> i64 {
    match obj.get(key) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        _ => 0,
    }
}

/// Resolve the action's type tag, `None` if missing or empty
fn resolve_action_type(action: &Map<String, Value>) -> Option<String> {
    if let Some(name) = string_field(action, &["actionType", "action_type", "type"]) {
        return Some(name.to_string());
    }
    let tag = action.get("$type").and_then(Value::as_str)?;
    let name = normalize_type_tag(tag);
    if name.is_empty() { None } else { Some(name) }
}

/// `"3|Game.Skills.DamageAction, Assembly-CSharp"` -> `"DamageAction"`
pub fn normalize_type_tag(tag: &str) -> String {
    let tag = tag.split_once('|').map(|(_, t)| t).unwrap_or(tag);
    let tag = tag.split(',').next().unwrap_or(tag).trim();
    tag.rsplit('.').next().unwrap_or(tag).trim().to_string()
}

/// The `parameters` object, or every non-structural key when there is none
fn parameters(action: &Map<String, Value>) -> Value {
    if let Some(params @ Value::Object(_)) = action.get("parameters") {
        return params.clone();
    }
    let rest: Map<String, Value> = action
        .iter()
        .filter(|(k, _)| !STRUCTURAL_KEYS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Value::Object(rest)
}

/// Short human description: type, timing, and a few scalar parameters
fn summarize(
    action_type: &str,
    frame: i64,
    duration: i64,
    parameters: &Value,
    max_params: usize,
) -> String {
    let mut summary = format!("{} @{}+{}", action_type, frame, duration);

    let shown: Vec<String> = parameters
        .as_object()
        .into_iter()
        .flatten()
        .filter_map(|(key, value)| {
            let text = scalar_text(value)?;
            Some(format!("{}={}", key, truncate(&text, SUMMARY_VALUE_MAX_CHARS)))
        })
        .take(max_params)
        .collect();

    if !shown.is_empty() {
        summary.push_str(": ");
        summary.push_str(&shown.join(", "));
    }
    summary
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_basic_document() {
        let doc = json!({
            "skillName": "Fireball",
            "tracks": [
                {
                    "trackName": "Anim",
                    "actions": [
                        { "frame": 0, "duration": 10, "actionType": "AnimationAction",
                          "parameters": { "animationClipName": "CastSpell01" } }
                    ]
                },
                {
                    "trackName": "Damage",
                    "enabled": false,
                    "actions": [
                        { "frame": 12, "duration": 1, "actionType": "DamageAction",
                          "parameters": { "baseDamage": 50 } },
                        { "frame": 14, "duration": 1, "actionType": "DamageAction",
                          "parameters": { "baseDamage": 75 } }
                    ]
                }
            ]
        });

        let flat = flatten_document("fire.json", "fire", &doc, 3).unwrap();
        assert_eq!(flat.records.len(), 3);
        assert_eq!(flat.skipped, 0);

        let last = &flat.records[2];
        assert_eq!(last.skill_name, "Fireball");
        assert_eq!(last.track_name, "Damage");
        assert!(!last.track_enabled);
        assert_eq!(last.json_path, "tracks[1].actions[1]");
        assert_eq!(last.parameters, json!({ "baseDamage": 75 }));
        assert_eq!(last.summary, "DamageAction @14+1: baseDamage=75");
    }

    #[test]
    fn test_malformed_actions_are_dropped_and_counted() {
        let doc = json!({
            "tracks": [{
                "actions": [
                    "not an object",
                    { "frame": 1 },
                    { "frame": 2, "actionType": "  " },
                    { "frame": 3, "actionType": "MoveAction" }
                ]
            }]
        });

        let flat = flatten_document("move.json", "move", &doc, 3).unwrap();
        assert_eq!(flat.skipped, 3);
        assert_eq!(flat.records.len(), 1);
        // Slot numbering follows the source array
        assert_eq!(flat.records[0].json_path, "tracks[0].actions[3]");
        assert_eq!(flat.records[0].skill_name, "move");
        assert_eq!(flat.records[0].track_name, "Track 0");
    }

    #[test]
    fn test_unexpected_shape_is_an_error() {
        assert!(flatten_document("a.json", "a", &json!([1, 2]), 3).is_err());
        assert!(flatten_document("a.json", "a", &json!({ "skillName": "x" }), 3).is_err());
    }

    #[test]
    fn test_inline_parameters_and_type_tag() {
        let doc = json!({
            "tracks": [{
                "actions": [{
                    "$type": "7|Game.Skills.Actions.SpawnEffectAction, Assembly-CSharp",
                    "frame": 5,
                    "effectName": "Burst",
                    "scale": 1.5
                }]
            }]
        });

        let flat = flatten_document("fx.json", "fx", &doc, 3).unwrap();
        let record = &flat.records[0];
        assert_eq!(record.action_type, "SpawnEffectAction");
        assert_eq!(record.parameters, json!({ "effectName": "Burst", "scale": 1.5 }));
    }

    #[test]
    fn test_normalize_type_tag() {
        assert_eq!(normalize_type_tag("DamageAction"), "DamageAction");
        assert_eq!(normalize_type_tag("A.B.DamageAction"), "DamageAction");
        assert_eq!(normalize_type_tag("1|A.DamageAction, Asm"), "DamageAction");
    }

    #[test]
    fn test_summary_truncates_and_limits() {
        let params = json!({
            "a": "x".repeat(40),
            "b": 2,
            "c": true,
            "d": 4,
            "nested": { "skip": 1 }
        });
        let summary = summarize("T", 1, 2, &params, 3);
        assert!(summary.starts_with("T @1+2: a="));
        assert!(summary.contains('…'));
        assert!(summary.contains("b=2"));
        assert!(summary.contains("c=true"));
        assert!(!summary.contains("d=4"));
    }

    #[test]
    fn test_relative_name_uses_forward_slashes() {
        let root = Path::new("/corpus");
        let path = root.join("mage").join("fire.json");
        assert_eq!(relative_name(root, &path).as_deref(), Some("mage/fire.json"));
    }
}
