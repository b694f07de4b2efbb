//! Advisory on-disk copy of the last snapshot.
//!
//! The artifact only speeds up the first incremental build of a fresh
//! process. It is never authoritative: anything unexpected about it (missing,
//! corrupt, other corpus, other version) means "do a full build".

use crate::index::build::Baseline;
use crate::index::types::{ActionRecord, FailedFile, IndexSnapshot, ManifestEntry};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const ARTIFACT_VERSION: u32 = 1;
const ARTIFACT_FILE: &str = "snapshot.json";

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotArtifact {
    version: u32,
    corpus_root: PathBuf,
    build_timestamp: u64,
    manifest: Vec<ManifestEntry>,
    failed_files: Vec<FailedFile>,
    records: Vec<Arc<ActionRecord>>,
}

/// Location of the artifact inside `dir`
pub fn artifact_path(dir: &Path) -> PathBuf {
    dir.join(ARTIFACT_FILE)
}

/// Serialize `snapshot` into `dir`, replacing any previous artifact.
pub fn save(dir: &Path, corpus_root: &Path, snapshot: &IndexSnapshot) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create artifact dir {}", dir.display()))?;

    let artifact = SnapshotArtifact {
        version: ARTIFACT_VERSION,
        corpus_root: corpus_root.to_path_buf(),
        build_timestamp: snapshot.build_timestamp,
        manifest: snapshot.manifest.clone(),
        failed_files: snapshot.failed_files.clone(),
        records: snapshot.records.clone(),
    };

    // Write to a temp file and rename so readers never see half an artifact
    let final_path = artifact_path(dir);
    let tmp_path = dir.join(format!("{}.tmp", ARTIFACT_FILE));
    {
        let file = File::create(&tmp_path)
            .with_context(|| format!("Failed to create {}", tmp_path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &artifact).context("Failed to serialize snapshot")?;
        writer.flush()?;
    }
    fs::rename(&tmp_path, &final_path)
        .with_context(|| format!("Failed to move artifact into {}", final_path.display()))?;

    tracing::debug!(
        "wrote snapshot artifact {} ({} records)",
        final_path.display(),
        artifact.records.len()
    );
    Ok(())
}

/// Load the artifact for `corpus_root` from `dir` as a rebuild baseline.
pub fn load(dir: &Path, corpus_root: &Path) -> Result<Baseline> {
    let path = artifact_path(dir);
    let file = File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
    let artifact: SnapshotArtifact = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    if artifact.version != ARTIFACT_VERSION {
        bail!(
            "artifact version {} does not match {}",
            artifact.version,
            ARTIFACT_VERSION
        );
    }
    if artifact.corpus_root != corpus_root {
        bail!(
            "artifact belongs to {}, not {}",
            artifact.corpus_root.display(),
            corpus_root.display()
        );
    }

    Ok(Baseline::new(&artifact.manifest, &artifact.records))
}

/// Delete the artifact if present
pub fn remove(dir: &Path) -> Result<()> {
    let path = artifact_path(dir);
    if path.exists() {
        fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}
