use crate::index::types::IndexSnapshot;
use serde::Serialize;
use serde_json::Value;

/// How many actions on each side of the target are listed as context
const NEIGHBOR_WINDOW: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionDetail {
    pub skill_file: String,
    pub json_path: String,
    /// Raw parameters payload of the action
    pub data: Value,
    /// Length of `data` as compact JSON
    pub size_bytes: usize,
    pub context: DetailContext,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailContext {
    pub skill_name: String,
    pub track_name: String,
    pub track_index: usize,
    pub action_index: usize,
    pub action_type: String,
    pub neighbors: Vec<NeighborSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborSummary {
    pub json_path: String,
    pub frame: i64,
    pub summary: String,
}

/// Resolve one action by its composite locator.
///
/// A stale or unknown locator yields `None`.
pub fn get_action_detail(
    snapshot: &IndexSnapshot,
    skill_file: &str,
    json_path: &str,
) -> Option<ActionDetail> {
    let pos = snapshot.position(skill_file, json_path)?;
    let record = &snapshot.records[pos];

    // Records of one track are contiguous in snapshot order
    let same_track = |i: &usize| {
        let other = &snapshot.records[*i];
        other.skill_file == record.skill_file && other.track_index == record.track_index
    };
    let before = (pos.saturating_sub(NEIGHBOR_WINDOW)..pos).filter(same_track);
    let after = (pos + 1..snapshot.records.len().min(pos + 1 + NEIGHBOR_WINDOW)).filter(same_track);

    let neighbors = before
        .chain(after)
        .map(|i| {
            let other = &snapshot.records[i];
            NeighborSummary {
                json_path: other.json_path.clone(),
                frame: other.frame,
                summary: other.summary.clone(),
            }
        })
        .collect();

    let size_bytes = serde_json::to_vec(&record.parameters)
        .map(|bytes| bytes.len())
        .unwrap_or(0);

    Some(ActionDetail {
        skill_file: record.skill_file.clone(),
        json_path: record.json_path.clone(),
        data: record.parameters.clone(),
        size_bytes,
        context: DetailContext {
            skill_name: record.skill_name.clone(),
            track_name: record.track_name.clone(),
            track_index: record.track_index,
            action_index: record.action_index,
            action_type: record.action_type.clone(),
            neighbors,
        },
    })
}
