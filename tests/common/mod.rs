//! Shared corpus fixture for integration tests.

#![allow(dead_code)]

use skilldex::AppConfig;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const FIREBALL: &str = r#"{
  "skillName": "Fireball",
  "tracks": [
    {
      "trackName": "Main",
      "actions": [
        { "frame": 0, "duration": 5, "actionType": "DamageAction", "parameters": { "baseDamage": 50, "element": "Fire" } },
        { "frame": 0, "duration": 12, "actionType": "AnimationAction", "parameters": { "animationClipName": "CastSpell01" } }
      ]
    },
    {
      "trackName": "Effects",
      "enabled": false,
      "actions": [
        { "frame": 10, "duration": 3, "actionType": "DamageAction", "parameters": { "baseDamage": 100, "element": "Fire" } }
      ]
    }
  ]
}"#;

pub const FROSTBOLT: &str = r#"{
  "skillName": "Frostbolt",
  "tracks": [
    {
      "trackName": "Main",
      "actions": [
        { "frame": 2, "duration": 8, "actionType": "AnimationAction", "parameters": { "animationClipName": "precast" } },
        { "frame": 8, "duration": 4, "actionType": "DamageAction", "parameters": { "baseDamage": 150, "element": "Frost" } },
        { "frame": 8, "duration": 20, "actionType": "SoundAction", "parameters": { "clip": "frost_hit", "volume": 0.8 } }
      ]
    }
  ]
}"#;

pub const DASH: &str = r#"{
  "skill_name": "Dash",
  "tracks": [
    {
      "track_name": "Movement",
      "actions": [
        { "frame": 0, "duration": 6, "action_type": "AnimationAction", "parameters": { "animationClipName": "Jump" } },
        { "$type": "3|Game.Skills.MoveAction, Assembly-CSharp", "frame": 1, "duration": 5, "speed": 12.5, "target": { "radius": 2 } }
      ]
    }
  ]
}"#;

pub const HEAL: &str = r#"{
  "tracks": [
    {
      "actions": [
        { "frame": 4, "duration": 1, "type": "HealAction", "healAmount": 80 }
      ]
    }
  ]
}"#;

pub const BROKEN: &str = r#"{ "skillName": "Broken", "tracks": [ "#;

/// Actions across the four valid documents
pub const VALID_ACTIONS: usize = 9;

/// Five documents, one of them invalid JSON
pub fn corpus() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "fireball.json", FIREBALL);
    write(dir.path(), "frost/frostbolt.json", FROSTBOLT);
    write(dir.path(), "movement/dash.json", DASH);
    write(dir.path(), "heal.json", HEAL);
    write(dir.path(), "broken.json", BROKEN);
    write(dir.path(), "README.md", "not a skill");
    dir
}

pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// Config that keeps artifacts inside `artifacts`
pub fn config(artifacts: &Path) -> AppConfig {
    AppConfig {
        artifact_dir: Some(artifacts.to_path_buf()),
        ..AppConfig::default()
    }
}
