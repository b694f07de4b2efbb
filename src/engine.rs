//! The [`SkillIndex`] facade: one corpus, its active snapshot, and the
//! result cache in front of it.

use crate::error::{IndexError, QuerySyntaxError};
use crate::index::artifact;
use crate::index::build::{Baseline, BuildOptions, build_snapshot, is_skill_document, relative_name};
use crate::index::detail::{ActionDetail, get_action_detail};
use crate::index::stats::{StatsResult, get_statistics};
use crate::index::store::IndexStore;
use crate::index::types::{IndexBuildStats, IndexSnapshot};
use crate::query::cache::{CacheKey, CacheStats, ResultCache};
use crate::query::executor::{QueryResult, evaluate};
use crate::query::parser::parse_query;
use crate::utils::AppConfig;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

pub struct SkillIndex {
    corpus_root: PathBuf,
    config: AppConfig,
    store: IndexStore,
    cache: ResultCache,
    /// Serializes rebuilds; only the holder swaps the active snapshot
    build_lock: Mutex<()>,
    /// `None` when no artifact location could be determined
    artifact_dir: Option<PathBuf>,
}

impl SkillIndex {
    pub fn new(corpus_root: impl Into<PathBuf>, config: AppConfig) -> Self {
        let corpus_root = corpus_root.into();
        let corpus_root = corpus_root.canonicalize().unwrap_or(corpus_root);

        let artifact_dir = match config.artifact_dir_for(&corpus_root) {
            Ok(dir) => Some(dir),
            Err(e) => {
                tracing::warn!("snapshot artifact disabled: {:#}", e);
                None
            }
        };

        Self {
            cache: ResultCache::new(
                config.cache_max_size,
                Duration::from_secs(config.cache_ttl_secs),
            ),
            corpus_root,
            config,
            store: IndexStore::new(),
            build_lock: Mutex::new(()),
            artifact_dir,
        }
    }

    pub fn corpus_root(&self) -> &Path {
        &self.corpus_root
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The snapshot currently answering queries
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.store.load()
    }

    /// Rebuild the index, reusing unchanged files unless `force_rebuild`.
    ///
    /// Concurrent calls queue; each performs its own pass. The previous
    /// snapshot stays active if the build fails.
    pub fn build_index(&self, force_rebuild: bool) -> Result<IndexBuildStats, IndexError> {
        let _guard = self
            .build_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let baseline = if force_rebuild {
            if let Some(dir) = &self.artifact_dir {
                if let Err(e) = artifact::remove(dir) {
                    tracing::warn!("{:#}", e);
                }
            }
            Baseline::default()
        } else {
            self.baseline()
        };

        let options = BuildOptions {
            summary_params: self.config.summary_params,
            parallel: self.config.parallel_parse,
        };
        let (snapshot, stats) = build_snapshot(&self.corpus_root, &baseline, &options)?;

        if self.config.persist_snapshot {
            if let Some(dir) = &self.artifact_dir {
                if let Err(e) = artifact::save(dir, &self.corpus_root, &snapshot) {
                    tracing::warn!("failed to write snapshot artifact: {:#}", e);
                }
            }
        }

        self.store.swap(snapshot);
        self.cache.clear();

        tracing::info!(
            "indexed {}/{} files ({} reused, {} failed), {} actions in {:.1}ms",
            stats.indexed_files,
            stats.total_files,
            stats.reused_files,
            stats.failed_files.len(),
            stats.total_actions,
            stats.elapsed_ms
        );
        Ok(stats)
    }

    /// Records of the previous generation: in memory if this process has
    /// built before, otherwise whatever the artifact offers.
    fn baseline(&self) -> Baseline {
        if self.store.generation() > 0 {
            return Baseline::from_snapshot(&self.store.load());
        }
        let Some(dir) = &self.artifact_dir else {
            return Baseline::default();
        };
        match artifact::load(dir, &self.corpus_root) {
            Ok(baseline) => {
                tracing::debug!("using snapshot artifact in {}", dir.display());
                baseline
            }
            Err(e) => {
                tracing::debug!("ignoring snapshot artifact: {:#}", e);
                Baseline::default()
            }
        }
    }

    /// Run a query against the active snapshot. `limit == 0` means unlimited.
    pub fn query(&self, query_text: &str, limit: usize) -> Result<QueryResult, QuerySyntaxError> {
        let start = Instant::now();
        let ast = parse_query(query_text)?;
        let key = CacheKey::new(ast.to_string(), limit);

        let (snapshot, generation) = self.store.current();
        if let Some(hit) = self.cache.get(&key, generation) {
            tracing::debug!("cache hit: {}", key.query);
            return Ok(QueryResult {
                results: hit.results,
                total_matches: hit.total_matches,
                query_time_ms: start.elapsed().as_secs_f64() * 1000.0,
                cache_hit: true,
            });
        }

        let mut result = evaluate(&ast, &snapshot, limit);
        self.cache
            .insert(key, generation, result.results.clone(), result.total_matches);

        result.query_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        Ok(result)
    }

    /// Group the active snapshot by `group_by`, optionally filtered by a query
    pub fn get_statistics(
        &self,
        group_by: &str,
        filter: Option<&str>,
    ) -> Result<StatsResult, QuerySyntaxError> {
        let filter = filter.map(parse_query).transpose()?;
        let snapshot = self.store.load();
        Ok(get_statistics(&snapshot, group_by, filter.as_ref()))
    }

    pub fn get_action_detail(&self, skill_file: &str, json_path: &str) -> Option<ActionDetail> {
        get_action_detail(&self.store.load(), skill_file, json_path)
    }

    pub fn get_cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Watcher hook: run an incremental rebuild if `path` is a skill document
    /// inside the corpus. Returns `Ok(None)` when the path is ignored.
    pub fn notify_file_changed(
        &self,
        path: &Path,
    ) -> Result<Option<IndexBuildStats>, IndexError> {
        if !is_skill_document(path) {
            return Ok(None);
        }

        // A deleted file can't be canonicalized, its parent usually can
        let resolved = path.canonicalize().unwrap_or_else(|_| {
            match (path.parent().and_then(|p| p.canonicalize().ok()), path.file_name()) {
                (Some(parent), Some(name)) => parent.join(name),
                _ => path.to_path_buf(),
            }
        });

        let Some(name) = relative_name(&self.corpus_root, &resolved) else {
            tracing::debug!("ignoring change outside corpus: {}", path.display());
            return Ok(None);
        };

        tracing::debug!("change in {}, rebuilding", name);
        self.build_index(false).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, SkillIndex) {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("fireball.json"),
            r#"{"skillName":"Fireball","tracks":[{"trackName":"Main","actions":[
                {"frame":0,"duration":5,"actionType":"DamageAction","parameters":{"baseDamage":120}},
                {"frame":5,"duration":10,"actionType":"AnimationAction","parameters":{"animationClipName":"CastSpell01"}}
            ]}]}"#,
        )
        .unwrap();
        let config = AppConfig {
            persist_snapshot: false,
            artifact_dir: Some(dir.path().join(".artifacts")),
            ..AppConfig::default()
        };
        let index = SkillIndex::new(dir.path(), config);
        (dir, index)
    }

    #[test]
    fn test_query_before_build_is_empty() {
        let (_dir, index) = setup();
        let result = index.query("DamageAction", 10).unwrap();
        assert_eq!(result.total_matches, 0);
    }

    #[test]
    fn test_query_cache_roundtrip() {
        let (_dir, index) = setup();
        index.build_index(false).unwrap();

        let first = index.query("DamageAction where baseDamage > 100", 10).unwrap();
        assert!(!first.cache_hit);
        assert_eq!(first.total_matches, 1);

        // Same canonical form, different spelling
        let second = index.query("DamageAction WHERE baseDamage>100", 10).unwrap();
        assert!(second.cache_hit);
        assert_eq!(second.results, first.results);

        // Type names are case-sensitive, so this is a different query
        let third = index.query("damageaction where baseDamage > 100", 10).unwrap();
        assert!(!third.cache_hit);
        assert_eq!(third.total_matches, 0);
    }

    #[test]
    fn test_rebuild_clears_cache() {
        let (_dir, index) = setup();
        index.build_index(false).unwrap();
        index.query("DamageAction", 10).unwrap();
        assert!(index.query("DamageAction", 10).unwrap().cache_hit);

        index.build_index(false).unwrap();
        assert_eq!(index.get_cache_stats().size, 0);
        assert!(!index.query("DamageAction", 10).unwrap().cache_hit);
    }

    #[test]
    fn test_result_from_previous_generation_is_not_served() {
        let (dir, index) = setup();
        index.build_index(false).unwrap();
        let (_, old_generation) = index.store.current();

        fs::write(
            dir.path().join("fireball.json"),
            r#"{"skillName":"Fireball","tracks":[{"trackName":"Main","actions":[
                {"frame":0,"duration":5,"actionType":"DamageAction","parameters":{"baseDamage":120}},
                {"frame":9,"duration":5,"actionType":"DamageAction","parameters":{"baseDamage":40}}
            ]}]}"#,
        )
        .unwrap();
        index.build_index(false).unwrap();

        // A query that evaluated the old snapshot finishes after the rebuild
        let key = CacheKey::new("DamageAction", 10);
        index.cache.insert(key, old_generation, Vec::new(), 1);

        let result = index.query("DamageAction", 10).unwrap();
        assert!(!result.cache_hit);
        assert_eq!(result.total_matches, 2);
        assert!(index.query("DamageAction", 10).unwrap().cache_hit);
    }

    #[test]
    fn test_syntax_error_surfaces() {
        let (_dir, index) = setup();
        let err = index.query("DamageAction where baseDamage >", 10).unwrap_err();
        assert!(!err.message.is_empty());
        assert!(index.get_statistics("action_type", Some("a or b")).is_err());
    }

    #[test]
    fn test_notify_ignores_foreign_paths() {
        let (_dir, index) = setup();
        let outside = TempDir::new().unwrap();
        let foreign = outside.path().join("other.json");
        fs::write(&foreign, "{}").unwrap();

        assert!(index.notify_file_changed(&foreign).unwrap().is_none());
        assert!(
            index
                .notify_file_changed(&index.corpus_root().join("notes.txt"))
                .unwrap()
                .is_none()
        );
        assert_eq!(index.store.generation(), 0);
    }

    #[test]
    fn test_notify_rebuilds_for_corpus_file() {
        let (dir, index) = setup();
        index.build_index(false).unwrap();
        let stats = index
            .notify_file_changed(&dir.path().join("fireball.json"))
            .unwrap()
            .unwrap();
        assert_eq!(stats.reused_files, 1);
    }
}
